/// Column classification used when building a search over a record type.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum FieldKind {
    Text,
    Numeric,
    Boolean,
    Other,
}

impl FieldKind {
    pub fn fields_of(schema: &'static [(&'static str, FieldKind)], kind: FieldKind) -> impl Iterator<Item = &'static str> {
        schema
            .iter()
            .filter(move |(_, k)| *k == kind)
            .map(|(name, _)| *name)
    }
}
