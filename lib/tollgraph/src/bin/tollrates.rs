use std::io::Write;
use std::path::PathBuf;
use itertools::Itertools;
use anyhow::{Context, Result};
use rayon::ThreadPoolBuilder;
use tracing::*;
use json::JsonValue;

use tollgraph::*;
use tollgraph::data::{self, EdgeList, LocId};
use tollgraph::matrix::{calculate_distance_matrix, AdjustRule, DistanceMatrix, PathLen};
use tollgraph::unroll::{unroll, UnrolledRecord};
use tollgraph::threshold::{find_ids_within_threshold, ThresholdMatch};
use tollgraph::toll::{calculate_toll_rates, RateTable, TollRecord, VehicleClass};
use tollgraph::timed::{calculate_time_based_toll_rates, Schedule, TimedTollRecord};

mod common;
use common::*;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct EdgeInput {
    /// Edge table (id_start,id_end,distance), or a table name if --dataset is given
    edges: String,
    /// Dataset directory with an INDEX.txt; resolved against $DATA_ROOT when relative
    #[structopt(long)]
    dataset: Option<PathBuf>,
}

impl EdgeInput {
    fn load(&self) -> Result<EdgeList<LocId>> {
        match &self.dataset {
            Some(dir) => data::get_edges_by_name(dir, &self.edges),
            None => data::load_edges(&self.edges),
        }
    }
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Shortest path distance matrix of the edge table
    Matrix {
        #[structopt(flatten)]
        input: EdgeInput,
        /// Scale cells: x0.75 above 20, x1.25 otherwise, rounded to one decimal
        #[structopt(long)]
        adjust: bool,
    },
    /// Flatten a distance matrix table into (id_start, id_end, distance) rows
    Unroll {
        matrix: PathBuf,
    },
    /// Ids with a distance within 10% of the reference location's average
    Threshold {
        #[structopt(flatten)]
        input: EdgeInput,
        #[structopt(long, short="r")]
        reference: LocId,
    },
    /// Toll rates per vehicle class, time modulated if trips are given
    Tolls {
        #[structopt(flatten)]
        input: EdgeInput,
        /// Trip table (id,id_2,startDay,startTime,endDay,endTime)
        #[structopt(long)]
        trips: Option<PathBuf>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(name = "tollrates")]
struct ClArgs {
    #[structopt(long, short="c", default_value="1", validator=clap_range_validator(Some(1), None))]
    cpus: usize,
    #[structopt(flatten)]
    output: OutputOptions,
    #[structopt(subcommand)]
    cmd: Command,
}


fn loc_json(l: &LocId) -> JsonValue {
    match l {
        LocId::Int(i) => (*i).into(),
        LocId::Name(s) => s.as_str().into(),
    }
}

fn path_len_json(d: PathLen) -> JsonValue {
    match d {
        PathLen::Finite(d) => d.into(),
        PathLen::Unreachable => JsonValue::Null,
    }
}

fn write_json_value(root: JsonValue, buf: &mut dyn Write) -> Result<()> {
    buf.write_all(root.pretty(2).as_bytes())?;
    writeln!(buf)?;
    Ok(())
}

fn csv_writer(buf: &mut dyn Write) -> csv::Writer<&mut dyn Write> {
    csv::Writer::from_writer(buf)
}

impl Report for DistanceMatrix<LocId> {
    fn write_csv(&self, buf: &mut dyn Write) -> Result<()> {
        let mut w = csv_writer(buf);
        let header = std::iter::once(String::new()).chain(self.locations().iter().map(|l| l.to_string()));
        w.write_record(header)?;
        for (i, loc) in self.locations().iter().enumerate() {
            let row = std::iter::once(loc.to_string()).chain(self.row(i).iter().map(|d| d.to_string()));
            w.write_record(row)?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_json(&self, buf: &mut dyn Write) -> Result<()> {
        let mut root = JsonValue::new_object();
        root["locations"] = self.locations().iter().map(loc_json).collect_vec().into();
        root["distances"] = (0..self.len())
            .map(|i| JsonValue::from(self.row(i).iter().map(|&d| path_len_json(d)).collect_vec()))
            .collect_vec()
            .into();
        write_json_value(root, buf)
    }
}

impl Report for Vec<UnrolledRecord<LocId>> {
    fn write_csv(&self, buf: &mut dyn Write) -> Result<()> {
        let mut w = csv_writer(buf);
        w.write_record(&["id_start", "id_end", "distance"])?;
        for r in self {
            w.write_record(&[r.origin.to_string(), r.destination.to_string(), r.distance.to_string()])?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_json(&self, buf: &mut dyn Write) -> Result<()> {
        let root: JsonValue = self.iter()
            .map(|r| {
                let mut obj = JsonValue::new_object();
                obj["id_start"] = loc_json(&r.origin);
                obj["id_end"] = loc_json(&r.destination);
                obj["distance"] = path_len_json(r.distance);
                obj
            })
            .collect_vec()
            .into();
        write_json_value(root, buf)
    }
}

impl Report for ThresholdMatch<LocId> {
    fn write_csv(&self, buf: &mut dyn Write) -> Result<()> {
        let mut w = csv_writer(buf);
        w.write_record(&["id"])?;
        for id in &self.ids {
            w.write_record(&[id.to_string()])?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_json(&self, buf: &mut dyn Write) -> Result<()> {
        let root = json::object! {
            reference: loc_json(&self.reference),
            average: self.average,
            lower: self.lower,
            upper: self.upper,
            ids: JsonValue::from(self.ids.iter().map(loc_json).collect_vec()),
        };
        write_json_value(root, buf)
    }
}

fn toll_fields(t: &TollRecord<LocId>) -> Vec<String> {
    let mut fields = vec![t.origin.to_string(), t.destination.to_string(), t.distance.to_string()];
    fields.extend(t.rates.iter().map(|(_, v)| v.to_string()));
    fields
}

fn toll_json(t: &TollRecord<LocId>) -> JsonValue {
    let mut obj = JsonValue::new_object();
    obj["id_start"] = loc_json(&t.origin);
    obj["id_end"] = loc_json(&t.destination);
    obj["distance"] = t.distance.into();
    for (c, v) in t.rates.iter() {
        obj[c.name()] = v.into();
    }
    obj
}

fn toll_header() -> Vec<&'static str> {
    let mut header = vec!["id_start", "id_end", "distance"];
    header.extend(VehicleClass::ALL.iter().map(|c| c.name()));
    header
}

impl Report for Vec<TollRecord<LocId>> {
    fn write_csv(&self, buf: &mut dyn Write) -> Result<()> {
        let mut w = csv_writer(buf);
        w.write_record(toll_header())?;
        for t in self {
            w.write_record(toll_fields(t))?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_json(&self, buf: &mut dyn Write) -> Result<()> {
        write_json_value(self.iter().map(toll_json).collect_vec().into(), buf)
    }
}

impl Report for Vec<TimedTollRecord<LocId>> {
    fn write_csv(&self, buf: &mut dyn Write) -> Result<()> {
        let mut w = csv_writer(buf);
        let mut header = toll_header();
        header.extend(&["start_day", "start_time", "end_day", "end_time", "discount"]);
        w.write_record(header)?;
        for r in self {
            let mut fields = toll_fields(&r.toll);
            fields.push(r.start_day().to_string());
            fields.push(r.start_time().format("%H:%M:%S").to_string());
            fields.push(r.end_day().to_string());
            fields.push(r.end_time().format("%H:%M:%S").to_string());
            fields.push(r.discount.map(|d| d.to_string()).unwrap_or_default());
            w.write_record(fields)?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_json(&self, buf: &mut dyn Write) -> Result<()> {
        let root: JsonValue = self.iter()
            .map(|r| {
                let mut obj = toll_json(&r.toll);
                obj["start_day"] = r.start_day().into();
                obj["start_time"] = r.start_time().format("%H:%M:%S").to_string().into();
                obj["end_day"] = r.end_day().into();
                obj["end_time"] = r.end_time().format("%H:%M:%S").to_string().into();
                obj["discount"] = match r.discount {
                    Some(d) => d.into(),
                    None => JsonValue::Null,
                };
                obj
            })
            .collect_vec()
            .into();
        write_json_value(root, buf)
    }
}


fn distance_records(input: &EdgeInput) -> Result<Vec<UnrolledRecord<LocId>>> {
    let edges = input.load()?;
    info!(table=%edges.id, edges=edges.edges.len(), "edges loaded");
    let matrix = calculate_distance_matrix(&edges.edges)
        .with_context(|| format!("failed to build distance matrix for {:?}", &edges.id))?;
    Ok(unroll(&matrix))
}

fn main() -> anyhow::Result<()> {
    let args : ClArgs = StructOpt::from_args();
    let _g = init_logging(args.output.log.clone())?;
    debug!(?args);
    ThreadPoolBuilder::new().num_threads(args.cpus).build_global()?;

    match &args.cmd {
        Command::Matrix { input, adjust } => {
            let edges = input.load()?;
            let matrix = calculate_distance_matrix(&edges.edges)
                .with_context(|| format!("failed to build distance matrix for {:?}", &edges.id))?;
            let matrix = if *adjust { matrix.adjust(&AdjustRule::default()) } else { matrix };
            output_report(&args.output, &matrix)?;
        },
        Command::Unroll { matrix } => {
            let raw = data::load_matrix(matrix)?;
            let matrix = DistanceMatrix::from_raw(raw)
                .with_context(|| format!("{:?} is not a valid distance matrix", matrix))?;
            output_report(&args.output, &unroll(&matrix))?;
        },
        Command::Threshold { input, reference } => {
            let records = distance_records(input)?;
            let found = find_ids_within_threshold(&records, reference)
                .with_context(|| format!("no threshold for reference {}", reference))?;
            info!(ids=found.ids.len(), average=found.average, "threshold search done");
            output_report(&args.output, &found)?;
        },
        Command::Tolls { input, trips } => {
            let records = distance_records(input)?;
            let tolls = calculate_toll_rates(&records, &RateTable::default());
            match trips {
                Some(path) => {
                    let trips = data::load_trips(path)?;
                    let timed = calculate_time_based_toll_rates(&tolls, &trips.trips, &Schedule::standard());
                    output_report(&args.output, &timed)?;
                },
                None => output_report(&args.output, &tolls)?,
            }
        },
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use tollgraph::data::Edge;
    use tolldata::raw::FromRaw;
    use std::borrow::Cow;

    fn islands() -> DistanceMatrix<LocId> {
        calculate_distance_matrix(&[
            Edge::<LocId>::new(1i64, 2i64, 4.0),
            Edge::new(2i64, 3i64, 6.0),
            Edge::new("Main St, North", 3i64, 2.5),
            Edge::new(10i64, 11i64, 2.5),
        ]).unwrap()
    }

    fn csv_of<R: Report + ?Sized>(report: &R) -> String {
        let mut buf = Vec::new();
        report.write(&mut buf, OutputFormat::Csv).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn json_of<R: Report + ?Sized>(report: &R) -> JsonValue {
        let mut buf = Vec::new();
        report.write(&mut buf, OutputFormat::Json).unwrap();
        json::parse(std::str::from_utf8(&buf).unwrap()).unwrap()
    }

    #[test]
    fn matrix_csv_reads_back() {
        let m = islands();
        let text = csv_of(&m);
        assert!(text.starts_with(",1,2,3,10,11,"));
        assert!(text.contains("\"Main St, North\""));
        let table = tolldata::parse_csv(&text).unwrap();
        let raw: data::RawMatrix<LocId> = FromRaw::from_raw(table, Cow::Borrowed("m")).unwrap();
        assert_eq!(DistanceMatrix::from_raw(raw).unwrap(), m);
    }

    #[test]
    fn matrix_json() {
        let m = islands();
        let root = json_of(&m);
        assert_eq!(root["locations"][0], 1);
        assert_eq!(root["locations"][5], "Main St, North");
        assert_eq!(root["distances"][0][1], 4.0);
        assert!(root["distances"][0][3].is_null());
    }

    #[test]
    fn unrolled_reports() {
        let records = unroll(&islands());
        let text = csv_of(&records);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id_start,id_end,distance"));
        assert_eq!(lines.next(), Some("1,2,4"));
        assert_eq!(lines.next(), Some("1,3,10"));
        assert_eq!(lines.next(), Some("1,10,"));
        let root = json_of(&records);
        assert_eq!(root.len(), records.len());
        assert_eq!(root[2]["id_end"], 10);
        assert!(root[2]["distance"].is_null());
    }

    #[test]
    fn threshold_reports() {
        let records = unroll(&islands());
        let found = find_ids_within_threshold(&records, &LocId::Int(1)).unwrap();
        let root = json_of(&found);
        assert_eq!(root["reference"], 1);
        assert_eq!(root["ids"].len(), found.ids.len());
        assert_eq!(csv_of(&found).lines().count(), found.ids.len() + 1);
    }

    #[test]
    fn toll_reports() {
        let records = unroll(&islands());
        let tolls = calculate_toll_rates(&records, &RateTable::default());
        let text = csv_of(&tolls);
        assert_eq!(text.lines().next(), Some("id_start,id_end,distance,moto,car,rv,bus,truck"));
        let root = json_of(&tolls);
        assert_eq!(root[0]["id_start"], 1);
        assert_eq!(root[0]["car"], 4.0 * 1.2);

        let trips = vec![
            data::Trip {
                origin: LocId::Int(1),
                destination: LocId::Int(2),
                start: data::WeekTime::parse("Monday", "11:00:00").unwrap(),
                end: data::WeekTime::parse("Monday", "11:30:00").unwrap(),
            },
            data::Trip {
                origin: LocId::Int(1),
                destination: LocId::Int(3),
                start: data::WeekTime::parse("Tuesday", "09:30:00").unwrap(),
                end: data::WeekTime::parse("Tuesday", "10:30:00").unwrap(),
            },
        ];
        let timed = calculate_time_based_toll_rates(&tolls, &trips, &Schedule::standard());
        let text = csv_of(&timed);
        let mut lines = text.lines();
        assert!(lines.next().unwrap().ends_with(",start_day,start_time,end_day,end_time,discount"));
        assert!(lines.next().unwrap().ends_with(",Monday,11:00:00,Monday,11:30:00,1.2"));
        assert!(lines.next().unwrap().ends_with(",Tuesday,09:30:00,Tuesday,10:30:00,"));
        let root = json_of(&timed);
        assert_eq!(root[0]["discount"], 1.2);
        assert!(root[1]["discount"].is_null());
        assert_eq!(root[1]["start_day"], "Tuesday");
    }
}
