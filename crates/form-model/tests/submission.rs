use serde_json::{Value, json};

use form_model::{
    FieldValue, FormDefinition, FormSpec, GeoPoint, InMemorySubmissions, NdjsonSubmissions,
    StoreError, Submission, SubmissionError, SubmissionKey, SubmissionSet, SubmissionSource,
};

fn household() -> FormDefinition {
    let spec: FormSpec =
        serde_json::from_str(include_str!("../tests/fixtures/household_form.json"))
            .expect("deserialize");
    FormDefinition::from_spec(&spec).expect("catalog")
}

fn records() -> Vec<Value> {
    serde_json::from_str(include_str!("../tests/fixtures/household_submissions.json"))
        .expect("records")
}

#[test]
fn decodes_groups_into_the_enclosing_set() {
    let form = household();
    let submission = Submission::from_json(&form, &records()[0]).expect("decode");
    let name = form.find("enumerator/enumerator_name").expect("field");

    assert_eq!(submission.key().as_str(), "uuid:0d4c7a5e-1");
    assert_eq!(
        submission.set().element_value(name),
        Some(&FieldValue::Text("R. Okafor".into()))
    );
}

#[test]
fn decodes_repeat_instances_with_typed_values() {
    let form = household();
    let submission = Submission::from_json(&form, &records()[0]).expect("decode");
    let visits = form.find("visits").expect("visits");
    let gps = form.find("visits/gps").expect("gps");
    let photo = form.find("visits/photo").expect("photo");
    let members = form.find("visits/members").expect("members");
    let age = form.find("visits/members/age").expect("age");

    let instances = submission.set().repeat_instances(visits);
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].key().as_str(), "uuid:0d4c7a5e-1/visits[1]");
    assert_eq!(
        instances[0].element_value(gps),
        Some(&FieldValue::GeoPoint(GeoPoint {
            latitude: Some(47.61),
            longitude: Some(-122.33),
            altitude: Some(12.0),
            accuracy: Some(5.0),
        }))
    );
    assert_eq!(
        instances[1].element_value(gps).and_then(FieldValue::as_geo_point),
        Some(&GeoPoint::new(47.62, -122.35))
    );
    assert_eq!(
        instances[0].element_value(photo).and_then(FieldValue::as_blob).map(|key| key.as_str()),
        Some("blob:photo-1")
    );
    assert!(instances[1].element_value(photo).is_none());

    let nested = instances[0].repeat_instances(members);
    assert_eq!(nested.len(), 2);
    assert_eq!(nested[1].key().as_str(), "uuid:0d4c7a5e-1/visits[1]/members[2]");
    assert_eq!(nested[1].element_value(age), Some(&FieldValue::Integer(9)));
}

#[test]
fn empty_repeat_yields_no_instances() {
    let form = household();
    let submission = Submission::from_json(&form, &records()[1]).expect("decode");
    let visits = form.find("visits").expect("visits");
    assert!(submission.set().repeat_instances(visits).is_empty());
}

#[test]
fn structural_mismatches_are_errors() {
    let form = household();
    let err = Submission::from_json(&form, &json!({ "id": "x", "data": { "visits": "oops" } }))
        .expect_err("repeat must be an array");
    assert_eq!(
        err,
        SubmissionError::ExpectedArray {
            key: "x".into(),
            path: "visits".into(),
        }
    );

    assert_eq!(
        Submission::from_json(&form, &json!({ "data": {} })).expect_err("missing id"),
        SubmissionError::MissingId
    );
    assert_eq!(
        Submission::from_json(&form, &json!({ "id": "y" })).expect_err("missing data"),
        SubmissionError::MissingData { key: "y".into() }
    );
}

#[test]
fn in_memory_source_reports_bad_records_individually() {
    let form = household();
    let mut source = InMemorySubmissions::new();
    source.push_json(records()[0].clone());
    source.push_json(json!({ "id": "broken", "data": { "enumerator": [] } }));
    source.push_json(records()[1].clone());

    let results = source.submissions(&form).collect::<Vec<_>>();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(StoreError::Decode { index: 1, .. })));
    assert!(results[2].is_ok());
}

#[test]
fn built_submissions_match_decoded_ones() {
    let form = household();
    let visits = form.find("visits").expect("visits");
    let gps = form.find("visits/gps").expect("gps");
    let survey = form.find("survey_name").expect("survey");

    let key = SubmissionKey::new("uuid:built");
    let mut instance = SubmissionSet::new(key.instance("visits", 1), visits);
    instance.set_value(gps, FieldValue::GeoPoint(GeoPoint::new(1.0, 2.0)));
    let mut record = SubmissionSet::new(key, form.root());
    record.set_value(survey, FieldValue::Text("Built".into()));
    record.push_instance(visits, instance);
    let built = Submission::new(record);

    let decoded = Submission::from_json(
        &form,
        &json!({ "id": "uuid:built", "data": {
            "survey_name": "Built",
            "visits": [{ "gps": "1 2" }]
        } }),
    )
    .expect("decode");
    assert_eq!(built, decoded);

    let source = vec![built].into_iter().collect::<InMemorySubmissions>();
    assert_eq!(source.len(), 1);
    assert!(!source.is_empty());
    let keys = source
        .submissions(&form)
        .map(|record| record.expect("record").key().to_string())
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["uuid:built"]);
}

#[test]
fn ndjson_source_streams_lines_once() {
    let form = household();
    let lines = format!("{}\n\n{{not json}}\n{}\n", records()[0], records()[1]);
    let source = NdjsonSubmissions::new(lines.as_bytes());

    let results = source.submissions(&form).collect::<Vec<_>>();
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].as_ref().map(|submission| submission.key().to_string()).ok().as_deref(),
        Some("uuid:0d4c7a5e-1")
    );
    assert!(matches!(results[1], Err(StoreError::Json { index: 1, .. })));
    assert!(results[2].is_ok());

    let again = source.submissions(&form).collect::<Vec<_>>();
    assert!(matches!(again.as_slice(), [Err(StoreError::Exhausted)]));
}

#[test]
fn ndjson_source_reports_non_utf8_lines_and_keeps_reading() {
    let form = household();
    let mut lines = b"{\"id\":\"\xfe\",\"data\":{}}\n".to_vec();
    lines.extend_from_slice(records()[1].to_string().as_bytes());
    let source = NdjsonSubmissions::new(lines.as_slice());

    let results = source.submissions(&form).collect::<Vec<_>>();
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0], Err(StoreError::Encoding { index: 0, .. })));
    assert!(results[1].is_ok());
}
