use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use galley_core::feature_pack_spec::{FeaturePackSpec, PackageSpec};
use galley_core::location::{Location, UniverseSpec};
use galley_universe::catalog::{Channel, ProducerEntry, UniverseCatalog};
use galley_universe::factory::{StaticUniverseFactory, UniverseFactory};
use galley_universe::loader::{FeaturePackLoader, TomlFeaturePackLoader};
use galley_universe::repository::{ArtifactCoords, ArtifactRepository, ArtifactTransport};
use galley_universe::resolver::UniverseResolver;
use galley_universe::version::VersionRange;
use galley_util::errors::{GalleyError, GalleyResult};

const UNIVERSE_TOML: &str = r#"
[producers.wildfly]
group = "org.wildfly"
artifact = "wildfly-galley-pack"
frequencies = ["alpha", "beta", "final"]
default-frequency = "final"
default-channel = "current"

[producers.wildfly.channels.current]
versions = "[20.0,)"

[producers.wildfly.channels.legacy]
versions = "[10.0,20.0)"
"#;

fn repo_with(builds: &[(&str, &str, &str)]) -> (tempfile::TempDir, Arc<ArtifactRepository>) {
    let tmp = tempfile::tempdir().unwrap();
    let repo = ArtifactRepository::new("local", tmp.path());
    for (group, artifact, version) in builds {
        repo.put(&ArtifactCoords::new(group, artifact, version), "marker", b"")
            .unwrap();
    }
    (tmp, Arc::new(repo))
}

fn loc(s: &str) -> Location {
    Location::parse(s).unwrap()
}

#[test]
fn implicit_universe_resolves_prefix_channels() {
    let (_tmp, repo) = repo_with(&[
        ("fp1", "fp1", "1.0.0.Final"),
        ("fp1", "fp1", "1.0.1.Final"),
        ("fp1", "fp1", "1.1.0.Beta1"),
        ("fp1", "fp1", "2.0.0.Final"),
    ]);
    let resolver = UniverseResolver::new(repo.clone());

    let dir = resolver.resolve(&loc("fp1:1#1.0.0.Final")).unwrap();
    assert!(dir.ends_with("fp1/fp1/1.0.0.Final"));

    let latest = resolver.resolve_latest_build(&loc("fp1:1")).unwrap();
    assert_eq!(latest.to_string(), "fp1:1#1.1.0.Beta1");

    let stable = resolver.resolve_latest_build(&loc("fp1:1/final")).unwrap();
    assert_eq!(stable.build(), Some("1.0.1.Final"));
    assert_eq!(stable.frequency(), Some("final"));
}

#[test]
fn build_outside_channel_is_unresolvable() {
    let (_tmp, repo) = repo_with(&[("fp1", "fp1", "2.0.0.Final")]);
    let resolver = UniverseResolver::new(repo);
    let err = resolver.resolve(&loc("fp1:1#2.0.0.Final")).unwrap_err();
    assert!(matches!(err, GalleyError::UnresolvableArtifact { .. }));
    assert!(err.to_string().contains("not part of channel 1"));
}

#[test]
fn missing_artifact_names_the_location() {
    let (_tmp, repo) = repo_with(&[]);
    let resolver = UniverseResolver::new(repo);
    let err = resolver.resolve(&loc("fp1:1#1.0")).unwrap_err();
    assert!(err.to_string().contains("fp1:1#1.0"));
}

#[test]
fn repo_universe_from_catalog_artifact() {
    let (_tmp, repo) = repo_with(&[
        ("org.wildfly", "wildfly-galley-pack", "19.1.0.Final"),
        ("org.wildfly", "wildfly-galley-pack", "21.0.0.Beta1"),
        ("org.wildfly", "wildfly-galley-pack", "20.0.1.Final"),
    ]);
    repo.put(
        &ArtifactCoords::new("org.example", "universe", "1.0.0"),
        "universe.toml",
        UNIVERSE_TOML.as_bytes(),
    )
    .unwrap();
    let resolver = UniverseResolver::new(repo.clone())
        .with_default_universe(UniverseSpec::parse("repo(org.example:universe)").unwrap());

    // Default channel and default frequency apply.
    let latest = resolver.resolve_latest_build(&loc("wildfly")).unwrap();
    assert_eq!(latest.to_string(), "wildfly:current#20.0.1.Final");
    assert_eq!(latest.channel(), Some("current"));
    assert_eq!(latest.build(), Some("20.0.1.Final"));

    let beta = resolver
        .resolve_latest_build(&loc("wildfly@repo(org.example:universe):current/beta"))
        .unwrap();
    assert_eq!(beta.build(), Some("21.0.0.Beta1"));

    let legacy = resolver
        .resolve_latest_build(&loc("wildfly@repo(org.example:universe:1.0.0):legacy"))
        .unwrap();
    assert_eq!(legacy.build(), Some("19.1.0.Final"));

    let dir = resolver
        .resolve(&loc("wildfly@repo(org.example:universe):current#20.0.1.Final"))
        .unwrap();
    assert!(dir.ends_with("org/wildfly/wildfly-galley-pack/20.0.1.Final"));
}

#[test]
fn unknown_levels_are_unresolvable() {
    let (_tmp, repo) = repo_with(&[]);
    repo.put(
        &ArtifactCoords::new("org.example", "universe", "1.0.0"),
        "universe.toml",
        UNIVERSE_TOML.as_bytes(),
    )
    .unwrap();
    let resolver = UniverseResolver::new(repo);

    let unknown_producer = resolver
        .resolve(&loc("eap@repo(org.example:universe):current#1.0"))
        .unwrap_err();
    assert!(unknown_producer.to_string().contains("not in universe"));

    let unknown_channel = resolver
        .resolve(&loc("wildfly@repo(org.example:universe):next#1.0"))
        .unwrap_err();
    assert!(unknown_channel.to_string().contains("has no channel next"));

    let unknown_frequency = resolver
        .resolve_latest_build(&loc("wildfly@repo(org.example:universe):current/snapshot"))
        .unwrap_err();
    assert!(unknown_frequency.to_string().contains("frequency 'snapshot'"));

    let unknown_factory = resolver
        .resolve(&loc("wildfly@nowhere:current#1.0"))
        .unwrap_err();
    assert!(unknown_factory.to_string().contains("no universe factory"));
}

struct CountingFactory {
    created: Arc<AtomicUsize>,
}

impl UniverseFactory for CountingFactory {
    fn factory_id(&self) -> &str {
        "counting"
    }

    fn create(
        &self,
        spec: &UniverseSpec,
        _transport: &dyn ArtifactTransport,
    ) -> GalleyResult<UniverseCatalog> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(UniverseCatalog::open(spec.clone()))
    }
}

#[test]
fn catalogs_are_memoized_per_universe() {
    let (_tmp, repo) = repo_with(&[("fp1", "fp1", "1.0")]);
    let created = Arc::new(AtomicUsize::new(0));
    let resolver = UniverseResolver::new(repo).with_factory(CountingFactory {
        created: created.clone(),
    });

    for _ in 0..3 {
        resolver.resolve(&loc("fp1@counting(a):1#1.0")).unwrap();
    }
    resolver.resolve(&loc("fp1@counting(b):1#1.0")).unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(resolver.cached_catalogs(), 2);
}

#[test]
fn static_catalogs_and_default_universe() {
    let (_tmp, repo) = repo_with(&[("org.acme", "fp", "1.2.0")]);
    let catalog = UniverseCatalog::new(UniverseSpec::new("acme", None)).with_producer(
        ProducerEntry::new("fp", "org.acme", "fp")
            .with_channel(Channel::ranged("1", VersionRange::parse("[1.0,2.0)")))
            .with_default_channel("1"),
    );
    let resolver = UniverseResolver::new(repo)
        .with_factory(StaticUniverseFactory::new("acme").with_catalog(None, catalog))
        .with_default_universe(UniverseSpec::new("acme", None));

    assert_eq!(resolver.default_universe().to_string(), "acme");
    let latest = resolver.resolve_latest_build(&loc("fp")).unwrap();
    assert_eq!(latest.to_string(), "fp:1#1.2.0");
}

#[test]
fn loader_reads_feature_pack_metadata_once() {
    let (_tmp, repo) = repo_with(&[]);
    let spec = FeaturePackSpec::new(loc("fp1:1#1.0.0.Final")).with_package(PackageSpec::new("p1"));
    repo.put_feature_pack(&ArtifactCoords::new("fp1", "fp1", "1.0.0.Final"), &spec)
        .unwrap();
    let loader = TomlFeaturePackLoader::new(Arc::new(UniverseResolver::new(repo.clone())));

    let first = loader.load(&loc("fp1:1#1.0.0.Final")).unwrap();
    assert_eq!(first.packages[0].name, "p1");
    let again = loader.load(&loc("fp1:1/final#1.0.0.Final")).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn loader_rejects_mismatched_metadata() {
    let (_tmp, repo) = repo_with(&[]);
    let spec = FeaturePackSpec::new(loc("other:1#1.0"));
    repo.put_feature_pack(&ArtifactCoords::new("fp1", "fp1", "1.0"), &spec)
        .unwrap();
    let loader = TomlFeaturePackLoader::new(Arc::new(UniverseResolver::new(repo)));
    let err = loader.load(&loc("fp1:1#1.0")).unwrap_err();
    assert!(err.to_string().contains("describes feature-pack other:1#1.0"));
}
