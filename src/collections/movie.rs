use crate::models::{
    EntitySchema, Fallback, FieldKind, FieldSpec, FilterSpec, Limit, Presence, Rule,
};

pub static MOVIES: EntitySchema = EntitySchema {
    collection: "movies",
    entity_name: "Movie",
    display_field: "title",
    fields: &[
        FieldSpec {
            name: "title",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::TitleCase, Rule::MaxLength(200)],
        },
        FieldSpec {
            name: "director",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::TitleCase, Rule::MaxLength(50)],
        },
        FieldSpec {
            name: "genre",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::TitleCase, Rule::MaxLength(50)],
        },
        FieldSpec {
            name: "release_year",
            kind: FieldKind::Integer,
            presence: Presence::Required,
            rules: &[Rule::YearUpToCurrent { min: 1888 }],
        },
        FieldSpec {
            name: "rating",
            kind: FieldKind::Float,
            presence: Presence::Required,
            rules: &[
                Rule::Range {
                    min: Some(Limit::Inclusive(0.0)),
                    max: Some(Limit::Inclusive(10.0)),
                },
                Rule::Round(1),
            ],
        },
        FieldSpec {
            name: "is_favorite",
            kind: FieldKind::Bool,
            presence: Presence::Default(Fallback::Bool(false)),
            rules: &[Rule::TruthyText],
        },
    ],
    filters: &[
        FilterSpec::Contains {
            param: "title",
            field: "title",
        },
        FilterSpec::Contains {
            param: "director",
            field: "director",
        },
        FilterSpec::Contains {
            param: "genre",
            field: "genre",
        },
        FilterSpec::Range {
            field: "release_year",
            min_param: "min_year",
            max_param: "max_year",
            floor: Some(1000.0),
        },
        FilterSpec::Equals {
            param: "is_favorite",
            field: "is_favorite",
        },
    ],
    sortable: &["title", "director", "genre", "release_year", "rating"],
    indexes: &["title", "director", "genre", "release_year"],
    computed: &[],
};
