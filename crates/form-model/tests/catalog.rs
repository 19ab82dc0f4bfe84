use form_model::spec::{ElementSpec, ElementType};
use form_model::{CatalogError, ElementKind, FieldType, FormDefinition, FormSpec, form_spec_schema};

fn fixture(name: &str) -> &'static str {
    match name {
        "household_form" => include_str!("../tests/fixtures/household_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn household() -> FormDefinition {
    let spec: FormSpec = serde_json::from_str(fixture("household_form")).expect("deserialize");
    FormDefinition::from_spec(&spec).expect("catalog")
}

#[test]
fn root_is_named_after_the_form() {
    let form = household();
    let root = form.top_level_group();
    assert_eq!(root.name(), "household_survey");
    assert_eq!(root.display_name(), "Household Survey");
    assert!(root.parent().is_none());
    assert_eq!(form.root(), root.id());
    assert_eq!(form.title(), "Household Survey");
    assert_eq!(form.version(), Some("2024031501"));
}

#[test]
fn paths_resolve_to_elements_and_back() {
    let form = household();
    let gps = form.find("visits/gps").expect("gps");
    assert_eq!(form[gps].kind(), ElementKind::Field(FieldType::GeoPoint));
    assert_eq!(form.path(gps), "visits/gps");
    assert_eq!(form[gps].label(), Some("Location"));
    assert_eq!(form[gps].display_name(), "Location");
    assert_eq!(
        form.find("/visits/members/age").map(|id| form.path(id)).as_deref(),
        Some("visits/members/age")
    );
    assert!(form.find("visits/missing").is_none());
    assert!(form.find("").is_none());
}

#[test]
fn parent_links_follow_the_tree() {
    let form = household();
    let visits = form.find("visits").expect("visits");
    let gps = form.find("visits/gps").expect("gps");
    let age = form.find("visits/members/age").expect("age");
    let name = form.find("enumerator/enumerator_name").expect("name");

    assert_eq!(form.parent(gps).map(|parent| parent.id()), Some(visits));
    assert!(form.is_descendant_of(age, visits));
    assert!(form.is_descendant_of(age, form.root()));
    assert!(!form.is_descendant_of(visits, age));
    assert!(!form.is_descendant_of(gps, gps));

    assert_eq!(form.enclosing_set(gps), visits);
    assert_eq!(form.enclosing_set(age), form.find("visits/members").expect("members"));
    assert_eq!(form.enclosing_set(name), form.root());
}

#[test]
fn fields_are_listed_in_schema_order() {
    let form = household();
    let names = form.fields().map(|field| field.name()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "survey_name",
            "enumerator_name",
            "visit_date",
            "gps",
            "caption",
            "photo",
            "notes",
            "member_name",
            "age",
            "comments",
        ]
    );
}

#[test]
fn duplicate_sibling_names_are_rejected() {
    let spec = FormSpec {
        id: "dupes".into(),
        title: "Dupes".into(),
        version: None,
        description: None,
        elements: vec![ElementSpec::container(
            "rep",
            ElementType::Repeat,
            vec![
                ElementSpec::field("a", ElementType::String),
                ElementSpec::field("a", ElementType::Integer),
            ],
        )],
    };
    let err = FormDefinition::from_spec(&spec).expect_err("duplicate");
    assert_eq!(
        err,
        CatalogError::DuplicateName {
            parent: "rep".into(),
            name: "a".into(),
        }
    );
}

#[test]
fn fields_cannot_declare_children() {
    let mut field = ElementSpec::field("loc", ElementType::Geopoint);
    field.children.push(ElementSpec::field("inner", ElementType::String));
    let spec = FormSpec {
        id: "bad".into(),
        title: "Bad".into(),
        version: None,
        description: None,
        elements: vec![field],
    };
    assert_eq!(
        FormDefinition::from_spec(&spec).expect_err("children on field"),
        CatalogError::ChildrenOnField { path: "loc".into() }
    );
}

#[test]
fn empty_form_id_and_slashed_names_are_rejected() {
    let mut spec = FormSpec {
        id: " ".into(),
        title: "Nameless".into(),
        version: None,
        description: None,
        elements: vec![],
    };
    assert_eq!(
        FormDefinition::from_spec(&spec).expect_err("empty id"),
        CatalogError::EmptyFormId
    );

    spec.id = "slashes".into();
    spec.elements.push(ElementSpec::field("a/b", ElementType::String));
    assert!(matches!(
        FormDefinition::from_spec(&spec),
        Err(CatalogError::InvalidName { .. })
    ));
}

#[test]
fn schema_lists_the_form_properties() {
    let schema = form_spec_schema().expect("schema");
    let properties = schema["properties"].as_object().expect("properties");
    assert!(properties.contains_key("id"));
    assert!(properties.contains_key("elements"));
}
