use polars::prelude::*;
use so2_monitors::ObservationTable;
use std::{env, path::PathBuf};

fn main() -> anyhow::Result<()> {
    // Path to the dataset written by `make-dataset`
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/processed/dataset.pkl"));
    let table = ObservationTable::from_pickle(&path)?;
    println!("# of records: {}", table.len());

    // For statistical analysis, the table is imported into a polars dataframe
    let mut columns = vec![Column::new(
        "timestamp".into(),
        table
            .index()
            .iter()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .collect::<Vec<String>>(),
    )];
    columns.extend(
        table
            .iter_columns()
            .map(|(name, values)| Column::new(name.into(), values.to_vec())),
    );
    let df = DataFrame::new(columns)?;
    println!("{}", df.head(None));
    println!("{}", df.null_count());

    Ok(())
}
