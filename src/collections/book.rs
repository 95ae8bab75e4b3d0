use crate::models::{
    EntitySchema, Fallback, FieldKind, FieldSpec, FilterSpec, Limit, Presence, Rule,
};

pub static BOOKS: EntitySchema = EntitySchema {
    collection: "books",
    entity_name: "Book",
    display_field: "title",
    fields: &[
        FieldSpec {
            name: "title",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::MaxLength(200)],
        },
        FieldSpec {
            name: "author",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::MaxLength(100)],
        },
        FieldSpec {
            name: "description",
            kind: FieldKind::Text,
            presence: Presence::Optional,
            rules: &[Rule::MaxLength(2000)],
        },
        FieldSpec {
            name: "published_year",
            kind: FieldKind::Integer,
            presence: Presence::Required,
            rules: &[Rule::YearUpToCurrent { min: 1000 }],
        },
        FieldSpec {
            name: "price",
            kind: FieldKind::Float,
            presence: Presence::Required,
            rules: &[
                Rule::Range {
                    min: Some(Limit::Exclusive(0.0)),
                    max: None,
                },
                Rule::Round(2),
            ],
        },
        FieldSpec {
            name: "genre",
            kind: FieldKind::Text,
            presence: Presence::Optional,
            rules: &[Rule::Trim, Rule::BlankAsNull, Rule::TitleCase, Rule::MaxLength(50)],
        },
        FieldSpec {
            name: "created_at",
            kind: FieldKind::Timestamp,
            presence: Presence::Generated(Fallback::Now),
            rules: &[],
        },
    ],
    filters: &[
        FilterSpec::Contains {
            param: "title",
            field: "title",
        },
        FilterSpec::Contains {
            param: "author",
            field: "author",
        },
        FilterSpec::Contains {
            param: "genre",
            field: "genre",
        },
        FilterSpec::Range {
            field: "price",
            min_param: "min_price",
            max_param: "max_price",
            floor: Some(0.0),
        },
        FilterSpec::Range {
            field: "published_year",
            min_param: "min_year",
            max_param: "max_year",
            floor: Some(1000.0),
        },
    ],
    sortable: &["price", "published_year", "title", "created_at"],
    indexes: &["title", "author", "genre", "published_year"],
    computed: &[],
};
