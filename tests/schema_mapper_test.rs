use astrofuse::fusion_errors::FusionError;
use astrofuse::records::{RawRecord, RawValue, RecordMetadata};
use astrofuse::schema_mapper::{
    AliasTable, MapperParams, MappingSnapshot, SchemaMapper, StandardField,
};

fn mapper() -> SchemaMapper {
    SchemaMapper::new(MapperParams::default()).unwrap()
}

fn rows(columns: &[&str], data: &[&[f64]]) -> Vec<RawRecord> {
    data.iter()
        .map(|row| {
            RawRecord::new(
                RecordMetadata::new("test"),
                columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| (c.to_string(), RawValue::Number(*v)))
                    .collect(),
            )
        })
        .collect()
}

#[test]
fn test_vizier_columns() {
    let result = mapper().suggest(&["RAJ2000", "DEJ2000", "Gmag"], None);
    assert!(result.is_valid());
    for (col, field) in [("RAJ2000", StandardField::Ra), ("DEJ2000", StandardField::Dec)] {
        let s = result.mapping_of(col).unwrap();
        assert_eq!(s.standard_field, field);
        assert!(s.confidence >= 0.90);
        assert!(!s.rationale.is_empty());
    }
    assert_eq!(result.column_for(StandardField::Magnitude), Some("Gmag"));
}

#[test]
fn test_missing_coordinate_is_invalid() {
    let result = mapper().suggest(&["RAJ2000", "Gmag"], None);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.contains("dec")));
    assert!(matches!(
        result.ensure_valid(),
        Err(FusionError::InvalidMapping(_))
    ));
}

#[test]
fn test_identical_input_identical_output() {
    let columns = ["alpha", "delta", "ra_deg", "mag_g", "Plx", "flag"];
    let samples = rows(
        &columns,
        &[
            &[120.0, 10.0, 120.0, 14.0, 3.0, 0.0],
            &[200.0, -5.0, 200.0, 15.5, 1.2, 1.0],
        ],
    );
    let m = mapper();
    let a = m.suggest(&columns, Some(&samples));
    let b = m.suggest(&columns, Some(&samples));
    assert_eq!(a, b);
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
}

#[test]
fn test_sample_pass_maps_anonymous_columns() {
    let columns = ["c1", "c2", "c3"];
    let samples = rows(
        &columns,
        &[&[150.2, -12.5, 11.2], &[210.7, 33.1, 9.8], &[301.0, 5.0, 13.4]],
    );
    let result = mapper().suggest(&columns, Some(&samples));
    assert_eq!(result.column_for(StandardField::Ra), Some("c1"));
    assert_eq!(result.column_for(StandardField::Dec), Some("c2"));
    let ra = result.mapping_of("c1").unwrap();
    assert!(ra.confidence < 0.75);
}

#[test]
fn test_snapshot_replay() {
    let m = mapper();
    let result = m.suggest(&["RA_ICRS", "DE_ICRS", "Source"], None);
    let text = result.to_json().unwrap();
    let replayed = MappingSnapshot::from_json(&text).unwrap().into_result().unwrap();
    assert_eq!(replayed.mapped_fields(), result.mapped_fields());
    assert!(replayed.is_valid());
}

#[test]
fn test_custom_alias_table() {
    let table = AliasTable::from_csv("standard_field,alias\nra,x_pos\ndec,y_pos\n").unwrap();
    let m = SchemaMapper::with_aliases(MapperParams::default(), table);
    let result = m.suggest(&["X_POS", "Y_POS"], None);
    assert!(result.is_valid());

    assert!(matches!(
        AliasTable::from_csv("standard_field,alias\nright_asc,x\n"),
        Err(FusionError::UnknownStandardField(_))
    ));
}

#[test]
fn test_override_rejects_unknown_field() {
    let m = mapper();
    let result = m.suggest(&["RAJ2000", "DEJ2000", "Vmag"], None);
    assert_eq!(
        m.apply_overrides(&result, &[("Vmag", "vmag")]).unwrap_err(),
        FusionError::UnknownStandardField("vmag".into())
    );
    assert_eq!(
        m.apply_overrides(&result, &[("Kmag", "magnitude")]).unwrap_err(),
        FusionError::UnknownRawColumn("Kmag".into())
    );
}
