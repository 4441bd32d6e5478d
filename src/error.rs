use crate::{
    calendar::CalendarError, clustering::ClusteringError, extract::ExtractError,
    features::FeatureError, loader::LoaderError, stats::StatsError, table::TableError,
    trends::TrendError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `calendar` module")]
    Calendar(#[from] CalendarError),
    #[error("Error in the `table` module")]
    Table(#[from] TableError),
    #[error("Error in the `loader` module")]
    Loader(#[from] LoaderError),
    #[error("Error in the `extract` module")]
    Extract(#[from] ExtractError),
    #[error("Error in the `stats` module")]
    Stats(#[from] StatsError),
    #[error("Error in the `features` module")]
    Features(#[from] FeatureError),
    #[error("Error in the `clustering` module")]
    Clustering(#[from] ClusteringError),
    #[error("Error in the `trends` module")]
    Trends(#[from] TrendError),
}
