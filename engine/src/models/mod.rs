// Engine-specific models. Cell and record shapes are in `shared::models`;
// what lives here is the per-source schema the normalizer is driven by.
pub mod column_spec;

pub use column_spec::{ColumnSpec, CompoundRule, FieldKind, FieldSpec};
