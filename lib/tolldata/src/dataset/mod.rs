use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::{Error, Map};
use std::borrow::Cow;


pub trait IdxNameMap {
  fn index_to_name(&self, idx: usize) -> Result<Cow<str>>;

  fn name_to_index(&self, name: &str) -> Result<usize>;

  fn len(&self) -> usize;

  fn check_idx(&self, idx: usize) -> Result<()> {
    if self.len() <= idx {
      Err(Error::IndexOutOfRange.into())
    } else {
      Ok(())
    }
  }
}


impl<'a, D: IdxNameMap> IdxNameMap for &'a D {
  fn index_to_name(&self, idx: usize) -> Result<Cow<str>> {
    D::index_to_name(self, idx)
  }

  fn name_to_index(&self, name: &str) -> Result<usize> {
    D::name_to_index(self, name)
  }

  fn len(&self) -> usize {
    D::len(self)
  }
}

pub trait Dataset: IdxNameMap + Sync {
  type Instance;
  fn load_instance(&self, idx: usize) -> Result<Self::Instance>;

  fn load_by_name(&self, name: &str) -> Result<Self::Instance> {
    self.load_instance(self.name_to_index(name)?)
  }
}


impl<'a, D: Dataset> Dataset for &'a D {
  type Instance = D::Instance;

  fn load_instance(&self, idx: usize) -> Result<Self::Instance> {
    D::load_instance(self, idx)
  }
}


/// A Standard Layout Dataset: a directory containing table files and an `INDEX.txt` index file.
/// The index file contains a whitespace separated list of table names, which acts as a map from index -> name.
/// Each table file is named `NAME.SUFFIX`.  Relative directories are resolved against `$DATA_ROOT`
/// when that variable is set.
pub struct StdLayout<D> {
  _marker: PhantomData<D>,
  name_order: Vec<String>,
  name_to_idx_map: Map<String, usize>,
  dir: PathBuf,
  suffix: String,
}


impl<D> StdLayout<D> {
  pub fn new(dir: impl AsRef<Path>, suffix: &str) -> Result<StdLayout<D>> {
    let dir = dir.as_ref();
    let dir = match std::env::var_os("DATA_ROOT") {
      Some(root) if dir.is_relative() => Path::new(&root).join(dir),
      _ => dir.to_path_buf(),
    };
    let ctx = format!("try read directory {:?}", &dir);
    let dir = dir.canonicalize().context(ctx)?;

    let contents = std::fs::read_to_string(dir.join("INDEX.txt"))
      .with_context(|| format!("failed to read index file in {:?}", &dir))?;
    let name_order: Vec<String> = contents.split_whitespace().map(|s| s.trim().to_string()).collect();
    let name_to_idx_map: Map<_, _> = name_order.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();

    Ok(StdLayout {
      _marker: PhantomData {},
      name_order,
      name_to_idx_map,
      dir,
      suffix: suffix.to_string(),
    })
  }

  /// File path of the table at `idx`.
  pub fn table_path(&self, idx: usize) -> Result<PathBuf> {
    let name = self.index_to_name(idx)?;
    let mut path = self.dir.join(&*name);
    path.set_extension(&self.suffix);
    Ok(path)
  }
}

impl<D> IdxNameMap for StdLayout<D> {
  fn index_to_name(&self, idx: usize) -> Result<Cow<str>> {
    self.check_idx(idx)?;
    Ok(Cow::Borrowed(&self.name_order[idx]))
  }

  fn name_to_index(&self, name: &str) -> Result<usize> {
    self.name_to_idx_map.get(name)
      .copied()
      .ok_or(Error::UnknownTableName)
      .with_context(|| format!("no table named {:?} in {:?}", name, &self.dir))
  }

  fn len(&self) -> usize { self.name_order.len() }
}


pub mod edges;
pub mod matrix;
pub mod trips;
