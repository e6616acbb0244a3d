use std::fmt::Display;
use std::str::FromStr;
use std::path::PathBuf;
use std::io;
use anyhow::Result;
use structopt::StructOpt;

#[derive(Clone, Debug, StructOpt)]
pub struct OutputOptions {
  #[structopt(long="format", short="f", parse(try_from_str), default_value="csv", possible_values=&OUTPUT_FORMAT_STRINGS)]
  pub fmt: OutputFormat,
  #[structopt(long="output", short="o")]
  pub file: Option<PathBuf>,
  /// Write an ndjson log to this file in addition to stderr
  #[structopt(long)]
  pub log: Option<PathBuf>,
}

pub fn clap_range_validator<T>(minval: Option<T>, maxval: Option<T>) -> impl Fn(String) -> Result<(), String>
    where
        T: FromStr + PartialOrd + Display + Copy,
        T::Err: Display
{
    return move |val| {
        let x: T = val.parse().map_err(|e: T::Err| e.to_string())?;
        if let Some(y) = minval {
            if x < y { return Err(format!("must be greater than {}", y).to_string()); }
        }
        if let Some(y) = maxval {
            if x > y { return Err(format!("must be less than {}", y).to_string()); }
        }
        return Ok(());
    };
}

pub const OUTPUT_FORMAT_STRINGS: [&str; 2] = ["csv", "json"];

#[derive(Debug, Copy, Clone)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("invalid string: {}", s))
        };
    }
}


impl Default for OutputFormat {
  fn default() -> Self { OutputFormat::Csv }
}


pub trait Report {
    fn write_csv(&self, buf : &mut dyn io::Write) -> Result<()>;
    fn write_json(&self, buf : &mut dyn io::Write) -> Result<()>;

    fn write(&self, buf : &mut dyn io::Write, output : OutputFormat) -> Result<()> {
        match output {
            OutputFormat::Csv => self.write_csv(buf)?,
            OutputFormat::Json => self.write_json(buf)?,
        };
        Ok(())
    }
}

pub fn output_report<R: Report + ?Sized>(options: &OutputOptions, report: &R) -> Result<()> {
  match options.file.as_ref() {
      Some(path) => {
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        report.write(&mut writer, options.fmt)?;
      }
      None => {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        report.write(&mut lock, options.fmt)?;
      }
    }
  Ok(())
}
