use std::fmt;
use std::ops::{Index, IndexMut};
use tracing::*;

use crate::*;
use crate::unroll::UnrolledRecord;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum VehicleClass {
    Moto,
    Car,
    Rv,
    Bus,
    Truck,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 5] = [
        VehicleClass::Moto,
        VehicleClass::Car,
        VehicleClass::Rv,
        VehicleClass::Bus,
        VehicleClass::Truck,
    ];

    /// Column name in toll reports.
    pub fn name(self) -> &'static str {
        match self {
            VehicleClass::Moto => "moto",
            VehicleClass::Car => "car",
            VehicleClass::Rv => "rv",
            VehicleClass::Bus => "bus",
            VehicleClass::Truck => "truck",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per vehicle class, indexed by [`VehicleClass`].
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PerClass([f64; 5]);

impl PerClass {
    pub fn from_fn(f: impl Fn(VehicleClass) -> f64) -> Self {
        let mut values = [0.0; 5];
        for (k, &c) in VehicleClass::ALL.iter().enumerate() {
            values[k] = f(c);
        }
        PerClass(values)
    }

    pub fn iter(&self) -> impl Iterator<Item=(VehicleClass, f64)> + '_ {
        VehicleClass::ALL.iter().copied().zip(self.0.iter().copied())
    }

    pub fn scale(&mut self, factor: f64) {
        for v in self.0.iter_mut() {
            *v *= factor;
        }
    }
}

impl Index<VehicleClass> for PerClass {
    type Output = f64;

    fn index(&self, c: VehicleClass) -> &f64 {
        &self.0[c as usize]
    }
}

impl IndexMut<VehicleClass> for PerClass {
    fn index_mut(&mut self, c: VehicleClass) -> &mut f64 {
        &mut self.0[c as usize]
    }
}

/// Rate coefficient per vehicle class, applied to distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RateTable(pub PerClass);

impl Default for RateTable {
    fn default() -> Self {
        RateTable(PerClass([0.8, 1.2, 1.5, 2.2, 3.6]))
    }
}

impl RateTable {
    pub fn rates_for(&self, distance: Distance) -> PerClass {
        PerClass::from_fn(|c| distance * self.0[c])
    }
}

/// A route with a finite distance and the toll for every vehicle class.
#[derive(Debug, Clone, PartialEq)]
pub struct TollRecord<L> {
    pub origin: L,
    pub destination: L,
    pub distance: Distance,
    pub rates: PerClass,
}

impl<L: Location> TollRecord<L> {
    /// Fails with [`Error::Unreachable`] if the record has no finite distance.
    pub fn from_unrolled(record: &UnrolledRecord<L>, table: &RateTable) -> anyhow::Result<Self> {
        let distance = record.distance.try_finite()?;
        Ok(TollRecord {
            origin: record.origin.clone(),
            destination: record.destination.clone(),
            distance,
            rates: table.rates_for(distance),
        })
    }
}

/// Flat toll rates for every reachable record.  Unreachable records are dropped.
#[instrument(level="debug", skip(records, table), fields(records=records.len()))]
pub fn calculate_toll_rates<L: Location>(records: &[UnrolledRecord<L>], table: &RateTable) -> Vec<TollRecord<L>> {
    let tolls: Vec<_> = records.iter()
        .filter_map(|r| match TollRecord::from_unrolled(r, table) {
            Ok(t) => Some(t),
            Err(_) => {
                trace!(origin=%r.origin, destination=%r.destination, "unreachable record skipped");
                None
            }
        })
        .collect();
    debug!(tolls=tolls.len(), skipped=records.len() - tolls.len(), "toll rates calculated");
    tolls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::PathLen;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn flat_rates() {
        let r = UnrolledRecord::<u32>::new(1u32, 2u32, PathLen::Finite(10.0));
        let t = TollRecord::from_unrolled(&r, &RateTable::default()).unwrap();
        assert_eq!(t.distance, 10.0);
        assert_close(t.rates[VehicleClass::Moto], 8.0);
        assert_close(t.rates[VehicleClass::Car], 12.0);
        assert_close(t.rates[VehicleClass::Rv], 15.0);
        assert_close(t.rates[VehicleClass::Bus], 22.0);
        assert_close(t.rates[VehicleClass::Truck], 36.0);
        let names: Vec<_> = t.rates.iter().map(|(c, _)| c.name()).collect();
        assert_eq!(names, vec!["moto", "car", "rv", "bus", "truck"]);
    }

    #[test]
    fn unreachable_is_rejected() {
        let r = UnrolledRecord::<u32>::new(1u32, 2u32, PathLen::Unreachable);
        let err = TollRecord::from_unrolled(&r, &RateTable::default()).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::Unreachable));

        let records = vec![r, UnrolledRecord::new(2u32, 1u32, PathLen::Finite(1.0))];
        let tolls = calculate_toll_rates(&records, &RateTable::default());
        assert_eq!(tolls.len(), 1);
        assert_eq!(tolls[0].origin, 2);
    }

    #[test]
    fn scale_all_classes() {
        let mut rates = RateTable::default().rates_for(10.0);
        rates.scale(0.5);
        assert_close(rates[VehicleClass::Truck], 18.0);
        assert_close(rates[VehicleClass::Moto], 4.0);
    }
}
