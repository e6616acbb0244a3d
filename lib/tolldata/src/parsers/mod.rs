mod csv;
pub use self::csv::{EdgeCsvFmt, TripCsvFmt, MatrixCsvFmt, parse_csv};

pub trait ParseInstance<Fmt>: Sized {
  fn parse(inputs: Fmt) -> crate::Result<Self>;
}
