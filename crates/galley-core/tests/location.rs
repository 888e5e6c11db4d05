use galley_core::location::{Location, UniverseSpec};
use galley_util::errors::GalleyError;

#[test]
fn every_valid_form_round_trips() {
    let producers = ["fp1", "org.example.fp"];
    let universes = ["", "@local", "@repo(org.example:universe)"];
    let channels = ["", ":1", ":1.x/beta", ":current/final"];
    let builds = ["", "#1.0.0.Final", "#2.0.0.Beta1"];
    for p in producers {
        for u in universes {
            for c in channels {
                if !u.is_empty() && c.is_empty() {
                    continue;
                }
                for b in builds {
                    let s = format!("{p}{u}{c}{b}");
                    let parsed = Location::parse(&s).unwrap_or_else(|e| panic!("{s}: {e}"));
                    assert_eq!(parsed.to_string(), s);
                }
            }
        }
    }
}

#[test]
fn parse_error_carries_offending_text() {
    match Location::parse("fp1@repo(x)").unwrap_err() {
        GalleyError::LocationFormat { input, .. } => assert_eq!(input, "fp1@repo(x)"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn builders_compose() {
    let loc = Location::new("fp1")
        .with_universe(Some(UniverseSpec::new("repo", Some("g:a".to_string()))))
        .with_channel("1")
        .with_frequency("final")
        .with_build("1.0.0.Final");
    assert_eq!(loc.to_string(), "fp1@repo(g:a):1/final#1.0.0.Final");
    assert_eq!(Location::parse(&loc.to_string()).unwrap(), loc);
}

#[test]
fn fpid_location_drops_frequency() {
    let loc = Location::parse("fp1:1/beta#1.0").unwrap();
    assert_eq!(loc.fpid().location().to_string(), "fp1:1#1.0");
}
