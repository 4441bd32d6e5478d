use chrono::NaiveDateTime;
use itertools::Itertools;
use so2_monitors::{CenturyRule, StationLoader};
use std::{fs, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "make-dataset",
    about = "Merging the parameter files of a monitoring station into a dataset"
)]
struct Opt {
    /// Dataset name, saved as `<output>/<filename>.pkl`
    filename: String,
    /// Monitoring station code
    station: String,
    /// Station parameters (all the available ones if none is given)
    #[structopt(short, long)]
    param: Vec<String>,
    /// Keeps only the last period of records, e.g. 52w, 365d or 12h
    #[structopt(long)]
    from_last: Option<String>,
    /// Date and time of the last record as "YYYY-MM-DD HH:MM"
    #[structopt(long, parse(try_from_str = parse_time))]
    to_date: Option<NaiveDateTime>,
    /// Path to the raw data repository
    #[structopt(long, default_value = "data/raw")]
    data_path: PathBuf,
    /// Path to the processed data repository
    #[structopt(short, long, default_value = "data/processed")]
    output: PathBuf,
    /// Leading digit of the 2-digit years of the 1900s
    #[structopt(long, default_value = "9")]
    legacy_digit: char,
    /// Field delimiter of the station files
    #[structopt(long, default_value = ";")]
    delimiter: char,
    /// Exports the dataset to `<output>/<filename>.csv` as well
    #[structopt(long)]
    csv: bool,
}

fn parse_time(time: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M")
}

fn ascii_delimiter(delimiter: char) -> anyhow::Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| anyhow::anyhow!("non-ASCII delimiter {:?}", delimiter))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let delimiter = ascii_delimiter(opt.delimiter)?;
    let mut loader = StationLoader::new(&opt.station)
        .data_path(&opt.data_path)
        .century_rule(CenturyRule::default().legacy_digit(opt.legacy_digit))
        .delimiter(delimiter);
    let params = if opt.param.is_empty() {
        loader.available_params()?
    } else {
        opt.param.clone()
    };
    println!("{} parameters: {}", opt.station, params.iter().join(", "));
    loader = loader.params(params);
    if let Some(arg) = opt.from_last {
        loader = loader.from_last(arg);
    }
    if let Some(arg) = opt.to_date {
        loader = loader.to_date(arg);
    }
    let table = loader.load()?;
    table.summary();

    fs::create_dir_all(&opt.output)?;
    let path = opt.output.join(&opt.filename).with_extension("pkl");
    table.to_pickle(&path)?;
    println!("Dataset saved to {:?}", path);
    if opt.csv {
        let path = path.with_extension("csv");
        table.to_csv(&path)?;
        println!("Dataset exported to {:?}", path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiters() {
        assert_eq!(ascii_delimiter(';').unwrap(), b';');
        assert_eq!(ascii_delimiter('\t').unwrap(), b'\t');
        assert!(ascii_delimiter('é').is_err());
        assert!(ascii_delimiter('¦').is_err());
        assert!(ascii_delimiter('→').is_err());
    }
}
