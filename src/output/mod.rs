pub mod export;
pub mod formatter;
pub mod sort;

pub use export::export_csv;
pub use formatter::{
    format_json, format_ranked_detail, format_ranked_table, format_score, format_tsv,
    format_weights, should_use_colors,
};
pub use sort::{is_sortable_column, sort_by_column};
