pub mod classification;
pub mod project;
pub mod season;

pub use classification::{Classification, ClassificationError, Ranking};
pub use project::{
    beginning_year, from_strray, parse_release_day, to_strray, ProjectRecord,
};
pub use season::{autoseason_name, SeasonClass, SeasonMeta, YearRange};
