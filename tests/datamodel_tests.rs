mod common;

use common::{document, CountingModel, DATAMODEL};
use itop_client::datamodel::{IndexOptions, SchemaIndex};
use itop_client::{ExternalFieldDescriptor, ItopError, LinkedSetDescriptor};
use std::io::Write;
use std::sync::Arc;

fn descriptor(key: &str, schema: &str, field: &str) -> ExternalFieldDescriptor {
    ExternalFieldDescriptor {
        foreign_key_field: key.to_string(),
        target_schema: schema.to_string(),
        target_field: field.to_string(),
    }
}

#[test]
fn test_schemas_in_document_order() {
    common::init_logging();
    let index = SchemaIndex::load(DATAMODEL).unwrap();
    assert_eq!(
        index.schemas(),
        vec![
            "Organization",
            "Contact",
            "Person",
            "Team",
            "lnkPersonToTeam",
            "ContactType"
        ]
    );
}

#[test]
fn test_child_equals_parent_with_overrides() {
    let index = SchemaIndex::load(DATAMODEL).unwrap();
    let contact = index.external_fields("Contact").unwrap();
    let person = index.external_fields("Person").unwrap();

    let mut expected = (*contact).clone();
    expected.insert(
        "manager_name".to_string(),
        descriptor("manager_id", "Person", "name"),
    );
    expected.insert("org_name".to_string(), descriptor("org_id", "Organization", "code"));

    assert_eq!(*person, expected);
    // Team declares no external fields of its own
    assert_eq!(*index.external_fields("Team").unwrap(), *contact);
}

#[test]
fn test_merge_runs_through_the_whole_chain() {
    let xml = r#"<itop_design>
  <class id="Location"><parent>cmdbAbstractObject</parent></class>
  <class id="Organization"><parent>cmdbAbstractObject</parent></class>
  <class id="Brand"><parent>cmdbAbstractObject</parent></class>
  <class id="PhysicalDevice"><parent>cmdbAbstractObject</parent>
    <fields>
      <field id="org_id" type="AttributeExternalKey"><target_class>Organization</target_class></field>
      <field id="org_name" type="AttributeExternalField">
        <extkey_attcode>org_id</extkey_attcode><target_attcode>name</target_attcode>
      </field>
      <field id="location_id" type="AttributeExternalKey"><target_class>Location</target_class></field>
      <field id="location_name" type="AttributeExternalField">
        <extkey_attcode>location_id</extkey_attcode><target_attcode>name</target_attcode>
      </field>
    </fields>
  </class>
  <class id="DatacenterDevice"><parent>PhysicalDevice</parent>
    <fields>
      <field id="brand_id" type="AttributeExternalKey"><target_class>Brand</target_class></field>
      <field id="brand_name" type="AttributeExternalField">
        <extkey_attcode>brand_id</extkey_attcode><target_attcode>name</target_attcode>
      </field>
    </fields>
  </class>
  <class id="Server"><parent>DatacenterDevice</parent>
    <fields>
      <field id="location_name" type="AttributeExternalField">
        <extkey_attcode>location_id</extkey_attcode><target_attcode>code</target_attcode>
      </field>
    </fields>
  </class>
</itop_design>"#;
    let index = SchemaIndex::load(xml).unwrap();
    let server = index.external_fields("Server").unwrap();

    assert_eq!(server.len(), 3);
    // Declared only on the grandparent
    assert_eq!(server["org_name"], descriptor("org_id", "Organization", "name"));
    assert_eq!(server["brand_name"], descriptor("brand_id", "Brand", "name"));
    assert_eq!(server["location_name"], descriptor("location_id", "Location", "code"));
    assert_eq!(
        index.external_fields("DatacenterDevice").unwrap()["location_name"],
        descriptor("location_id", "Location", "name")
    );
}

#[test]
fn test_root_schema_contributes_nothing() {
    let index = SchemaIndex::load(DATAMODEL).unwrap();
    let contact = index.external_fields("Contact").unwrap();
    assert_eq!(contact.len(), 1);
    assert_eq!(contact["org_name"], descriptor("org_id", "Organization", "name"));
}

#[test]
fn test_configurable_root_schema() {
    let options = IndexOptions {
        root_schema: "Contact".to_string(),
    };
    let index = SchemaIndex::new(document(), options);
    let person = index.external_fields("Person").unwrap();

    // Nothing inherited from Contact, Person's own org_name still applies
    assert_eq!(person.len(), 2);
    assert_eq!(person["org_name"].target_field, "code");
    assert!(index.external_fields("Team").unwrap().is_empty());
}

#[test]
fn test_hierarchical_key_targets_declaring_schema() {
    let index = SchemaIndex::load(DATAMODEL).unwrap();
    let org = index.external_fields("Organization").unwrap();
    assert_eq!(org["parent_name"], descriptor("parent_id", "Organization", "name"));
}

#[test]
fn test_linked_sets_are_not_inherited() {
    let index = SchemaIndex::load(DATAMODEL).unwrap();
    let person = index.linked_sets("Person").unwrap();
    assert_eq!(
        person["team_list"],
        LinkedSetDescriptor {
            join_schema: "lnkPersonToTeam".to_string(),
            key_to_owner: "person_id".to_string(),
            key_to_remote: "team_id".to_string(),
        }
    );
    assert!(index.linked_sets("Contact").unwrap().is_empty());
    assert_eq!(index.linked_sets("Team").unwrap().len(), 1);
}

#[test]
fn test_unknown_schema_is_an_error() {
    let index = SchemaIndex::load(DATAMODEL).unwrap();
    assert!(matches!(
        index.external_fields("Server"),
        Err(ItopError::SchemaNotFound(name)) if name == "Server"
    ));
    assert!(matches!(
        index.linked_sets("Server"),
        Err(ItopError::SchemaNotFound(_))
    ));
}

#[test]
fn test_repeated_calls_hit_the_cache() {
    let index = SchemaIndex::new(CountingModel::new(document()), IndexOptions::default());

    let first = index.external_fields("Person").unwrap();
    let after_first = index.model().lookups();
    assert!(after_first > 0);

    let second = index.external_fields("Person").unwrap();
    assert_eq!(first, second);
    assert_eq!(index.model().lookups(), after_first);

    // Contact was filled on the way up, so it is a hit as well
    index.external_fields("Contact").unwrap();
    assert_eq!(index.model().lookups(), after_first);

    let sets = index.linked_sets("Person").unwrap();
    let after_sets = index.model().lookups();
    assert_eq!(index.linked_sets("Person").unwrap(), sets);
    assert_eq!(index.model().lookups(), after_sets);
}

#[test]
fn test_concurrent_first_access() {
    let index = Arc::new(SchemaIndex::load(DATAMODEL).unwrap());

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                scope.spawn(move || index.external_fields("Person").unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in &results {
        assert_eq!(result, &results[0]);
    }
    assert_eq!(results[0].len(), 2);
}

#[test]
fn test_missing_sub_element_is_malformed() {
    let xml = r#"<itop_design>
  <class id="Contact">
    <fields>
      <field id="org_id" type="AttributeExternalKey"><target_class>Organization</target_class></field>
      <field id="org_name" type="AttributeExternalField">
        <extkey_attcode>org_id</extkey_attcode>
      </field>
      <field id="teams" type="AttributeLinkedSetIndirect">
        <linked_class>lnkContactToTeam</linked_class>
        <ext_key_to_me>contact_id</ext_key_to_me>
      </field>
    </fields>
  </class>
</itop_design>"#;
    let index = SchemaIndex::load(xml).unwrap();

    match index.external_fields("Contact") {
        Err(ItopError::MalformedField { schema, field, .. }) => {
            assert_eq!(schema, "Contact");
            assert_eq!(field, "org_name");
        }
        other => panic!("expected a malformed field, got {:?}", other),
    }
    assert!(matches!(
        index.linked_sets("Contact"),
        Err(ItopError::MalformedField { .. })
    ));
}

#[test]
fn test_key_without_target_class_is_malformed() {
    let xml = r#"<itop_design>
  <class id="Contact">
    <fields>
      <field id="org_id" type="AttributeExternalKey"/>
      <field id="org_name" type="AttributeExternalField">
        <extkey_attcode>org_id</extkey_attcode><target_attcode>name</target_attcode>
      </field>
    </fields>
  </class>
</itop_design>"#;
    let index = SchemaIndex::load(xml).unwrap();
    assert!(matches!(
        index.external_fields("Contact"),
        Err(ItopError::MalformedField { field, .. }) if field == "org_id"
    ));
}

#[test]
fn test_not_well_formed_document() {
    assert!(matches!(
        SchemaIndex::load("<itop_design><classes>"),
        Err(ItopError::Parse(_))
    ));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DATAMODEL.as_bytes()).unwrap();

    let index = SchemaIndex::from_file(file.path(), IndexOptions::default()).unwrap();
    assert_eq!(index.schemas().len(), 6);
    assert_eq!(index.external_fields("lnkPersonToTeam").unwrap().len(), 3);
}
