//! Station records loader
//!
//! Each monitored parameter of a station is stored in its own file
//! `<data path>/<station>/<station>_<parameter>.csv`, `;` separated with `,` decimal marks.
//! The first two columns are the date code (`YYMMDD`) and the time code (`HHMM`),
//! followed by three value columns.
//! The parameter files are joined on the date and time codes into a single [ObservationTable].

use chrono::{Duration, NaiveDateTime};
use flate2::read::GzDecoder;
use regex::Regex;
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
    time::Instant,
};

use crate::{
    calendar::{CalendarError, CenturyRule},
    table::{ObservationTable, TableError},
};

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error("failed to open the station file")]
    Io(#[from] std::io::Error),
    #[error("failed to read the station CSV file")]
    Csv(#[from] csv::Error),
    #[error("no station file found for {0:?}")]
    NotFound(PathBuf),
    #[error("{0:?} is missing the date and time code columns")]
    MissingColumn(PathBuf),
    #[error("malformed value {value:?} for {param} at line {line}")]
    MalformedValue {
        param: String,
        line: u64,
        value: String,
    },
    #[error("malformed period {0:?}, expected e.g. 30D, 12H, 2W or 90min")]
    MalformedPeriod(String),
    #[error("no parameter to load")]
    NoParameters,
    #[error("no record left after joining the parameters of station {0}")]
    Empty(String),
    #[error("failed to build the station index")]
    Calendar(#[from] CalendarError),
    #[error("failed to build the station table")]
    Table(#[from] TableError),
    #[error("invalid regular expression")]
    Regex(#[from] regex::Error),
    #[error("invalid station file pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list the station files")]
    Glob(#[from] glob::GlobError),
}
type Result<T> = std::result::Result<T, LoaderError>;

/// Number of leading columns read from a station file
const N_COLUMN: usize = 5;

/// Records of one parameter file
struct ParamRecords {
    codes: Vec<(String, String)>,
    columns: Vec<(String, Vec<Option<f64>>)>,
}

/// Parses a period such as `30D`, `12H`, `2W` or `90min`
pub fn parse_period(period: &str) -> Result<Duration> {
    let re = Regex::new(r"(?i)^\s*(\d+)\s*(w|d|h|min|t)\s*$")?;
    let capts = re
        .captures(period)
        .ok_or_else(|| LoaderError::MalformedPeriod(period.to_string()))?;
    let n: i64 = capts[1]
        .parse()
        .map_err(|_| LoaderError::MalformedPeriod(period.to_string()))?;
    Ok(match capts[2].to_lowercase().as_str() {
        "w" => Duration::weeks(n),
        "d" => Duration::days(n),
        "h" => Duration::hours(n),
        _ => Duration::minutes(n),
    })
}

/// Fields read as absent values
const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Parses a value field, with either `,` or `.` as decimal mark
///
/// Empty fields, NA tokens and non-finite numbers are absent values.
fn parse_value(field: &str) -> Option<std::result::Result<f64, std::num::ParseFloatError>> {
    let field = field.trim();
    if field.is_empty() || NA_TOKENS.contains(&field) {
        return None;
    }
    match field.replace(',', ".").parse::<f64>() {
        Ok(value) if !value.is_finite() => None,
        value => Some(value),
    }
}

/// Station records loader builder
pub struct StationLoader {
    data_path: PathBuf,
    station: String,
    params: Vec<String>,
    from_last: Option<String>,
    to_date: Option<NaiveDateTime>,
    century_rule: CenturyRule,
    delimiter: u8,
}
impl Default for StationLoader {
    fn default() -> Self {
        Self {
            data_path: Path::new("data").join("raw"),
            station: String::new(),
            params: vec![],
            from_last: None,
            to_date: None,
            century_rule: CenturyRule::default(),
            delimiter: b';',
        }
    }
}
impl StationLoader {
    pub fn new<S: Into<String>>(station: S) -> Self {
        Self {
            station: station.into(),
            ..Default::default()
        }
    }
    /// Directory with one sub-directory per station
    pub fn data_path<P: AsRef<Path>>(self, data_path: P) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn station<S: Into<String>>(self, station: S) -> Self {
        Self {
            station: station.into(),
            ..self
        }
    }
    pub fn params<S: Into<String>>(self, params: Vec<S>) -> Self {
        Self {
            params: params.into_iter().map(|p| p.into()).collect(),
            ..self
        }
    }
    /// Keeps only the last period (e.g. `365D`) before the end date
    pub fn from_last<S: Into<String>>(self, period: S) -> Self {
        Self {
            from_last: Some(period.into()),
            ..self
        }
    }
    /// End date of the records, defaults to the last record
    pub fn to_date(self, to_date: NaiveDateTime) -> Self {
        Self {
            to_date: Some(to_date),
            ..self
        }
    }
    pub fn century_rule(self, century_rule: CenturyRule) -> Self {
        Self {
            century_rule,
            ..self
        }
    }
    pub fn delimiter(self, delimiter: u8) -> Self {
        Self { delimiter, ..self }
    }
    fn station_path(&self) -> PathBuf {
        self.data_path.join(&self.station)
    }
    /// Path to the file of parameter `param`
    pub fn param_path(&self, param: &str) -> PathBuf {
        self.station_path()
            .join(format!("{}_{}.csv", self.station, param))
    }
    /// Lists the parameters available for the station
    pub fn available_params(&self) -> Result<Vec<String>> {
        let prefix = format!("{}_", self.station);
        let pattern = self.station_path().join(format!("{}*.csv*", prefix));
        let mut params = vec![];
        for entry in glob::glob(&pattern.to_string_lossy())? {
            let path = entry?;
            if let Some(param) = path
                .file_name()
                .and_then(|f| f.to_str())
                .and_then(|f| f.strip_prefix(&prefix))
                .and_then(|f| f.split(".csv").next())
            {
                params.push(param.to_string());
            }
        }
        params.sort();
        params.dedup();
        Ok(params)
    }
    /// Opens a parameter file, falling back to its compressed versions
    fn open(&self, param: &str) -> Result<Box<dyn Read>> {
        let path = self.param_path(param);
        if path.exists() {
            return Ok(Box::new(BufReader::new(File::open(path)?)));
        }
        let gz_path = path.with_extension("csv.gz");
        if gz_path.exists() {
            return Ok(Box::new(GzDecoder::new(File::open(gz_path)?)));
        }
        #[cfg(feature = "bzip2")]
        {
            let bz2_path = path.with_extension("csv.bz2");
            if bz2_path.exists() {
                let buf = BufReader::new(File::open(bz2_path)?);
                return Ok(Box::new(bzip2::bufread::BzDecoder::new(buf)));
            }
        }
        Err(LoaderError::NotFound(path))
    }
    fn read_param(&self, param: &str) -> Result<ParamRecords> {
        log::info!("Loading {:?}...", self.param_path(param));
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(self.open(param)?);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .take(N_COLUMN)
            .map(|h| h.trim().to_string())
            .collect();
        if headers.len() < 2 {
            return Err(LoaderError::MissingColumn(self.param_path(param)));
        }
        let mut columns: Vec<(String, Vec<Option<f64>>)> = headers
            .iter()
            .skip(2)
            .map(|h| (format!("{}_{}", h, param), vec![]))
            .collect();
        let mut codes = vec![];

        for result in rdr.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let (Some(date_code), Some(time_code)) = (record.get(0), record.get(1)) else {
                continue;
            };
            codes.push((date_code.trim().to_string(), time_code.trim().to_string()));
            for (k, (_, values)) in columns.iter_mut().enumerate() {
                let field = record.get(2 + k).unwrap_or("");
                let value = match parse_value(field) {
                    Some(Ok(value)) => Some(value),
                    Some(Err(_)) => {
                        return Err(LoaderError::MalformedValue {
                            param: param.to_string(),
                            line,
                            value: field.to_string(),
                        })
                    }
                    None => None,
                };
                values.push(value);
            }
        }
        Ok(ParamRecords { codes, columns })
    }
    /// Loads the station records
    pub fn load(self) -> Result<ObservationTable> {
        if self.params.is_empty() {
            return Err(LoaderError::NoParameters);
        }
        let now = Instant::now();
        let mut records = self
            .params
            .iter()
            .map(|param| self.read_param(param))
            .collect::<Result<Vec<ParamRecords>>>()?
            .into_iter();
        let Some(first) = records.next() else {
            return Err(LoaderError::NoParameters);
        };
        let others: Vec<(HashMap<(String, String), usize>, ParamRecords)> = records
            .map(|r| {
                let rows = r
                    .codes
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(i, code)| (code, i))
                    .collect();
                (rows, r)
            })
            .collect();

        // inner join on the date and time codes, in the order of the first parameter
        let joined: Vec<(usize, Vec<usize>)> = first
            .codes
            .iter()
            .enumerate()
            .filter_map(|(i, code)| {
                others
                    .iter()
                    .map(|(rows, _)| rows.get(code).cloned())
                    .collect::<Option<Vec<usize>>>()
                    .map(|j| (i, j))
            })
            .collect();
        if joined.is_empty() {
            return Err(LoaderError::Empty(self.station.clone()));
        }

        let index = self.century_rule.index(
            joined
                .iter()
                .map(|(i, _)| (first.codes[*i].0.as_str(), first.codes[*i].1.as_str())),
        )?;
        let mut columns: Vec<(String, Vec<Option<f64>>)> = first
            .columns
            .iter()
            .map(|(name, values)| {
                (
                    name.clone(),
                    joined.iter().map(|(i, _)| values[*i]).collect(),
                )
            })
            .collect();
        for (k, (_, other)) in others.iter().enumerate() {
            columns.extend(other.columns.iter().map(|(name, values)| {
                (
                    name.clone(),
                    joined.iter().map(|(_, j)| values[j[k]]).collect(),
                )
            }));
        }
        let table = ObservationTable::new(index, columns)?;
        table.ensure_chronological()?;

        let Some((_, last)) = table.time_range() else {
            return Err(LoaderError::Empty(self.station.clone()));
        };
        let to_date = self.to_date.unwrap_or(last);
        let from_date = self
            .from_last
            .as_deref()
            .map(parse_period)
            .transpose()?
            .map(|period| to_date - period);
        let table = table.between(from_date, to_date);
        log::info!(
            "... loaded {} records of {} columns in {}ms",
            table.len(),
            table.n_columns(),
            now.elapsed().as_millis()
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    const SO2: &str = "FECHA (YYMMDD);HORA (HHMM);Registros validados;Registros preliminares;Registros no validados
210101;0;10,5;;
210101;100;12;;
210101;200;;;3,25
210102;0;400;;
";
    const MP10: &str = "FECHA (YYMMDD);HORA (HHMM);Registros validados;Registros preliminares;Registros no validados
210101;100;30;;
210101;200;31;;
210102;0;32;;
";

    fn station(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join("so2-monitors").join(name);
        let path = root.join("QUI");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("QUI_SO2.csv"), SO2).unwrap();
        fs::write(path.join("QUI_MP10.csv"), MP10).unwrap();
        root
    }

    #[test]
    fn periods() {
        assert_eq!(parse_period("30D").unwrap(), Duration::days(30));
        assert_eq!(parse_period("12h").unwrap(), Duration::hours(12));
        assert_eq!(parse_period("2W").unwrap(), Duration::weeks(2));
        assert_eq!(parse_period("90min").unwrap(), Duration::minutes(90));
        assert!(matches!(
            parse_period("a year"),
            Err(LoaderError::MalformedPeriod(_))
        ));
    }

    #[test]
    fn values() {
        assert_eq!(parse_value(" 10,5 "), Some(Ok(10.5)));
        assert_eq!(parse_value("3.25"), Some(Ok(3.25)));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value(" n/a"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value("-Infinity"), None);
        assert!(matches!(parse_value("1,2,3"), Some(Err(_))));
        assert!(matches!(parse_value("ppb"), Some(Err(_))));
    }

    #[test]
    fn absent_tokens() {
        let root = std::env::temp_dir().join("so2-monitors").join("tokens");
        let path = root.join("QUI");
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join("QUI_SO2.csv"),
            "FECHA;HORA;v1;v2;v3\n210101;0;10;;\n210101;100;NaN;;\n210101;200;20;;\n",
        )
        .unwrap();
        let table = StationLoader::new("QUI")
            .data_path(&root)
            .params(vec!["SO2"])
            .load()
            .unwrap();
        assert_eq!(
            table.column("v1_SO2").unwrap(),
            &[Some(10.), None, Some(20.)]
        );
        let counts = table.counts();
        assert_eq!(counts[0].present, 2);
        assert_eq!(counts[0].absent, 1);
    }

    #[test]
    fn single_param() {
        let root = station("single");
        let table = StationLoader::new("QUI")
            .data_path(&root)
            .params(vec!["SO2"])
            .load()
            .unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.columns()[0],
            "Registros validados_SO2".to_string()
        );
        assert_eq!(table.n_columns(), 3);
        let so2 = table.column("Registros validados_SO2").unwrap();
        assert_eq!(so2, &[Some(10.5), Some(12.), None, Some(400.)]);
        let no_valid = table.column("Registros no validados_SO2").unwrap();
        assert_eq!(no_valid[2], Some(3.25));
        assert_eq!(
            table.index()[1],
            NaiveDate::from_ymd_opt(2021, 1, 1)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn joined_params() {
        let root = station("joined");
        let table = StationLoader::new("QUI")
            .data_path(&root)
            .params(vec!["SO2", "MP10"])
            .load()
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.n_columns(), 6);
        assert_eq!(
            table.column("Registros validados_MP10").unwrap(),
            &[Some(30.), Some(31.), Some(32.)]
        );
        assert_eq!(
            table.column("Registros validados_SO2").unwrap(),
            &[Some(12.), None, Some(400.)]
        );
    }

    #[test]
    fn last_period() {
        let root = station("period");
        let table = StationLoader::new("QUI")
            .data_path(&root)
            .params(vec!["SO2"])
            .from_last("2H")
            .load()
            .unwrap();
        // 2021-01-01 22:00 to 2021-01-02 00:00
        assert_eq!(table.len(), 1);
        let to_date = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap();
        let table = StationLoader::new("QUI")
            .data_path(&root)
            .params(vec!["SO2"])
            .from_last("1H")
            .to_date(to_date)
            .load()
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn available() {
        let root = station("available");
        let params = StationLoader::new("QUI")
            .data_path(&root)
            .available_params()
            .unwrap();
        assert_eq!(params, vec!["MP10".to_string(), "SO2".to_string()]);
    }

    #[test]
    fn missing() {
        let root = station("missing");
        assert!(matches!(
            StationLoader::new("QUI")
                .data_path(&root)
                .params(vec!["NO2"])
                .load(),
            Err(LoaderError::NotFound(_))
        ));
        assert!(matches!(
            StationLoader::new("QUI").data_path(&root).load(),
            Err(LoaderError::NoParameters)
        ));
    }
}
