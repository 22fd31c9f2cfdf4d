pub mod catalog;
pub mod metadata;
pub mod table;

pub use catalog::{DescribeRow, IndexRow, KeyUsageRow};
pub use metadata::{PropertyMetadata, PropertyType, RelationKind, RelationMetadata, TableMetadata};
pub use table::{ColumnInfo, ForeignKeyInfo, IndexInfo, ReferentialAction, TableDetail};
