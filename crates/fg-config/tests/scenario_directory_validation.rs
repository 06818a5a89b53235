//! Scenario: typed extraction of the zone / actor / child directory.
//!
//! GREEN when:
//! - a well-formed directory yields typed zones, actors and children with
//!   actor zone order preserved;
//! - each broken reference or bad geometry is refused with CONFIG_INVALID.

use fg_config::{load_layered_yaml_from_strings, FieldGateConfig};
use fg_schemas::{ActorId, ChildId, Role, ZoneId};

const DIRECTORY: &str = r#"
gate:
  verification_roles: [field_worker, caregiver]
  auto_start: false
location:
  timeout_ms: 4000
  max_cached_age_ms: 0
  high_accuracy: false
zones:
  - id: johnson-home
    name: Johnson Family Home
    address: 123 Main St, Anytown, ST 12345
    latitude: 40.7128
    longitude: -74.0060
    radius_meters: 100
  - id: smith-home
    name: Smith Family Home
    latitude: 40.7589
    longitude: -73.9851
    radius_meters: 100
children:
  - id: emma
    name: Emma Johnson
    home_zone: johnson-home
  - id: liam
    home_zone: smith-home
actors:
  - id: fw-1
    role: field_worker
    zones: [smith-home, johnson-home]
    children: [emma, liam]
  - id: admin-1
    role: admin
"#;

fn load(yaml: &str) -> anyhow::Result<FieldGateConfig> {
    let loaded = load_layered_yaml_from_strings(&[yaml])?;
    FieldGateConfig::from_loaded(&loaded)
}

fn invalid(yaml: &str) -> String {
    let err = load(yaml).expect_err("must be refused");
    let msg = format!("{err:#}");
    assert!(msg.contains("CONFIG_INVALID"), "{msg}");
    msg
}

#[test]
fn directory_loads_typed() {
    let cfg = load(DIRECTORY).expect("valid directory");

    assert!(cfg.gate.requires_verification(Role::Caregiver));
    assert!(!cfg.gate.auto_start);
    assert_eq!(cfg.location.timeout.as_millis(), 4000);
    assert!(cfg.location.max_cached_age.is_zero());
    assert!(!cfg.location.high_accuracy);

    assert_eq!(cfg.zones.len(), 2);
    let johnson = cfg.zone(&ZoneId::new("johnson-home")).expect("zone");
    assert_eq!(johnson.display_name, "Johnson Family Home");
    assert_eq!(johnson.address, "123 Main St, Anytown, ST 12345");

    let fw = cfg.actor(&ActorId::new("fw-1")).expect("actor");
    assert_eq!(fw.role, Role::FieldWorker);
    let order: Vec<_> = cfg.zones_for(fw).into_iter().map(|z| z.id.0).collect();
    assert_eq!(order, vec!["smith-home", "johnson-home"]);
    assert!(fw.is_assigned_child(&ChildId::new("liam")));

    let liam = cfg.children.iter().find(|c| c.id.0 == "liam").expect("child");
    assert_eq!(liam.display_name, "liam");

    let admin = cfg.actor(&ActorId::new("admin-1")).expect("admin");
    assert!(cfg.zones_for(admin).is_empty());
}

#[test]
fn zero_radius_refused() {
    let msg = invalid(
        r#"
zones:
  - { id: z1, latitude: 1.0, longitude: 1.0, radius_meters: 0 }
"#,
    );
    assert!(msg.contains("radius_meters"), "{msg}");
}

#[test]
fn out_of_range_latitude_refused() {
    invalid(
        r#"
zones:
  - { id: z1, latitude: 91.0, longitude: 1.0, radius_meters: 10 }
"#,
    );
}

#[test]
fn duplicate_zone_refused() {
    let msg = invalid(
        r#"
zones:
  - { id: z1, latitude: 1.0, longitude: 1.0, radius_meters: 10 }
  - { id: z1, latitude: 2.0, longitude: 2.0, radius_meters: 10 }
"#,
    );
    assert!(msg.contains("duplicate zone id z1"), "{msg}");
}

#[test]
fn actor_with_unknown_zone_refused() {
    let msg = invalid(
        r#"
actors:
  - { id: fw-1, role: field_worker, zones: [nowhere] }
"#,
    );
    assert!(msg.contains("unknown zone nowhere"), "{msg}");
}

#[test]
fn actor_with_unknown_child_refused() {
    let msg = invalid(
        r#"
actors:
  - { id: fw-1, role: field_worker, children: [ghost] }
"#,
    );
    assert!(msg.contains("unknown child ghost"), "{msg}");
}

#[test]
fn child_with_unknown_home_refused() {
    invalid(
        r#"
children:
  - { id: emma, home_zone: nowhere }
"#,
    );
}

#[test]
fn unknown_role_refused() {
    invalid(
        r#"
actors:
  - { id: x, role: pilot }
"#,
    );
}
