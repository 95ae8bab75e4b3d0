use crate::models::{
    EntitySchema, Fallback, FieldKind, FieldSpec, FilterSpec, Limit, Presence, Rule,
};

/// Product reviews
pub static REVIEWS: EntitySchema = EntitySchema {
    collection: "reviews",
    entity_name: "Review",
    display_field: "name",
    fields: &[
        FieldSpec {
            name: "name",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::MaxLength(100)],
        },
        FieldSpec {
            name: "product",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::MaxLength(150)],
        },
        FieldSpec {
            name: "rating",
            kind: FieldKind::Float,
            presence: Presence::Required,
            rules: &[
                Rule::Range {
                    min: Some(Limit::Inclusive(0.0)),
                    max: Some(Limit::Inclusive(5.0)),
                },
                Rule::Round(1),
            ],
        },
        FieldSpec {
            name: "review",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::MaxLength(2000)],
        },
        FieldSpec {
            name: "date",
            kind: FieldKind::Timestamp,
            presence: Presence::Default(Fallback::Now),
            rules: &[],
        },
    ],
    filters: &[
        FilterSpec::Contains {
            param: "name",
            field: "name",
        },
        FilterSpec::Contains {
            param: "product",
            field: "product",
        },
        FilterSpec::Range {
            field: "rating",
            min_param: "min_rating",
            max_param: "max_rating",
            floor: Some(0.0),
        },
    ],
    sortable: &["rating", "date", "name"],
    indexes: &["product", "rating"],
    computed: &[],
};
