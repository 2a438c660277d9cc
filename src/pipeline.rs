//! Three-stage run: flat index -> filtered subgraph -> rendered DOT.
//!
//! Each stage's output is a cache artifact keyed by the content that produced
//! it; a stage whose artifact is current is skipped.

use std::path::PathBuf;

use crate::cache::{ArtifactCache, ArtifactKind, ArtifactMeta, CacheStatus};
use crate::config::{Config, XmlSchema};
use crate::error::{MubinGraphError, Result};
use crate::graph::{filter_reachable, render_dot, DuplicatePolicy, Object, RenderOptions};
use crate::ident::HashId;
use crate::ingest::{
    build_index, discover_sources, hash_parts, source_fingerprint, source_name, SourceDocument,
};

/// A resolved set of source documents and its content identity.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub name: String,
    pub root: PathBuf,
    pub documents: Vec<SourceDocument>,
    pub fingerprint: String,
}

impl SourceSet {
    /// Resolve `reference` as a configured logical name, falling back to a directory path.
    pub fn open(reference: &str, config: &Config) -> Result<Self> {
        let (name, root) = match config.source(reference) {
            Some(root) => (reference.to_string(), root.to_path_buf()),
            None => {
                let root = PathBuf::from(reference);
                if !root.is_dir() {
                    return Err(MubinGraphError::SourceNotFound(format!(
                        "{:?} is neither a configured source nor a directory",
                        reference
                    )));
                }
                (source_name(&root), root)
            }
        };

        let documents = discover_sources(&root)?;
        let fingerprint = source_fingerprint(&documents, &config.schema)?;
        log::debug!("Source {} fingerprint {}", name, fingerprint);

        Ok(Self {
            name,
            root,
            documents,
            fingerprint,
        })
    }
}

/// Where a stage's result came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub path: PathBuf,
    pub cached: bool,
}

/// Summary of a full run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub seed: HashId,
    /// `None` when the subgraph came from cache and the index was never loaded.
    pub index: Option<StageOutcome>,
    pub subgraph: StageOutcome,
    pub graph: StageOutcome,
    pub subgraph_records: usize,
}

impl RunOutcome {
    /// True when the seed matched nothing and the rendered graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.subgraph_records == 0
    }
}

/// Runs the stages against one cache directory.
pub struct Pipeline {
    cache: ArtifactCache,
    schema: XmlSchema,
    policy: DuplicatePolicy,
    render: RenderOptions,
    force: bool,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            cache: ArtifactCache::new(config.cache_dir()),
            schema: config.schema.clone(),
            policy: config.graph.duplicates,
            render: RenderOptions::from(&config.render),
            force: false,
        }
    }

    /// Rebuild every stage regardless of cache state.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// `<name>-<fingerprint prefix>`; distinct directories sharing a basename get distinct stems.
    fn artifact_stem(source: &SourceSet) -> String {
        let prefix = source.fingerprint.get(..8).unwrap_or(&source.fingerprint);
        format!("{}-{}", source.name, prefix)
    }

    fn index_name(source: &SourceSet) -> String {
        format!("{}.json", Self::artifact_stem(source))
    }

    fn subgraph_name(source: &SourceSet, seed: HashId) -> String {
        format!("{}_{}.json", Self::artifact_stem(source), seed.to_hex())
    }

    fn graph_name(source: &SourceSet, seed: HashId) -> String {
        format!("{}_{}.dot", Self::artifact_stem(source), seed.to_hex())
    }

    fn subgraph_key(&self, source: &SourceSet, seed: HashId) -> String {
        let seed_hex = seed.to_hex();
        hash_parts([source.fingerprint.as_str(), seed_hex.as_str(), self.policy.as_str()])
    }

    fn graph_key(&self, source: &SourceSet, seed: HashId) -> String {
        let subgraph_key = self.subgraph_key(source, seed);
        let options = self.render.fingerprint_input();
        hash_parts([subgraph_key.as_str(), options.as_str()])
    }

    /// True (and logged) when the artifact can be reused.
    fn reusable(&self, name: &str, key: &str) -> bool {
        if self.force {
            log::info!("{}: rebuilding (forced)", name);
            return false;
        }
        match self.cache.lookup(name, key) {
            CacheStatus::Hit(meta) => {
                log::info!("{}: cached ({} records, built {})", name, meta.records, meta.created_at);
                true
            }
            CacheStatus::Stale(_) => {
                log::info!("{}: stale, rebuilding", name);
                false
            }
            CacheStatus::Missing => {
                log::debug!("{}: not cached", name);
                false
            }
        }
    }

    /// Load or build the flat index for `source`.
    pub fn flat_index(&self, source: &SourceSet) -> Result<(Vec<Object>, StageOutcome)> {
        let name = Self::index_name(source);

        if self.reusable(&name, &source.fingerprint) {
            let objects: Vec<Object> = self.cache.read_json(&name)?;
            let path = self.cache.artifact_path(&name);
            return Ok((objects, StageOutcome { path, cached: true }));
        }

        log::info!(
            "Building flat index for {} from {} document(s)",
            source.name,
            source.documents.len()
        );
        let report = build_index(&source.documents, &self.schema);
        let meta = ArtifactMeta::new(source.fingerprint.as_str(), ArtifactKind::Index, source.name.as_str())
            .with_records(report.objects.len());
        let path = self.cache.store_json(&name, &report.objects, &meta)?;
        log::info!("Flat index: {} object(s) -> {}", report.objects.len(), path.display());

        Ok((report.objects, StageOutcome { path, cached: false }))
    }

    /// Load or compute the subgraph reachable from `seed`.
    ///
    /// `index` is only invoked when the subgraph has to be recomputed.
    pub fn subgraph<F>(&self, source: &SourceSet, seed: HashId, index: F) -> Result<(Vec<Object>, StageOutcome)>
    where
        F: FnOnce() -> Result<Vec<Object>>,
    {
        let name = Self::subgraph_name(source, seed);
        let key = self.subgraph_key(source, seed);

        if self.reusable(&name, &key) {
            let objects: Vec<Object> = self.cache.read_json(&name)?;
            let path = self.cache.artifact_path(&name);
            return Ok((objects, StageOutcome { path, cached: true }));
        }

        let objects = index()?;
        let filtered = filter_reachable(&objects, seed, self.policy);
        let meta = ArtifactMeta::new(key, ArtifactKind::Subgraph, source.name.as_str())
            .with_seed(seed.to_hex())
            .with_records(filtered.len());
        let path = self.cache.store_json(&name, &filtered, &meta)?;

        Ok((filtered, StageOutcome { path, cached: false }))
    }

    /// Load or produce the DOT rendering of a subgraph.
    pub fn graph(&self, source: &SourceSet, seed: HashId, subgraph: &[Object]) -> Result<StageOutcome> {
        let name = Self::graph_name(source, seed);
        let key = self.graph_key(source, seed);

        if self.reusable(&name, &key) {
            let path = self.cache.artifact_path(&name);
            return Ok(StageOutcome { path, cached: true });
        }

        let (dot, report) = render_dot(subgraph, &self.render);
        let meta = ArtifactMeta::new(key, ArtifactKind::Graph, source.name.as_str())
            .with_seed(seed.to_hex())
            .with_records(report.nodes);
        let path = self.cache.store_text(&name, &dot, &meta)?;
        log::info!(
            "Rendered {} node(s), {} edge(s) -> {}",
            report.nodes,
            report.edges,
            path.display()
        );

        Ok(StageOutcome { path, cached: false })
    }

    /// Run all stages for one seed.
    pub fn run(&self, source: &SourceSet, seed: HashId) -> Result<RunOutcome> {
        let mut index_outcome = None;
        let (subgraph, subgraph_outcome) = self.subgraph(source, seed, || {
            let (objects, outcome) = self.flat_index(source)?;
            index_outcome = Some(outcome);
            Ok(objects)
        })?;

        if subgraph.is_empty() {
            log::warn!(
                "Seed {} ({}) is not present in {}; the rendered graph is empty",
                seed,
                seed.to_decimal(),
                source.name
            );
        }

        let graph_outcome = self.graph(source, seed, &subgraph)?;

        Ok(RunOutcome {
            seed,
            index: index_outcome,
            subgraph: subgraph_outcome,
            graph: graph_outcome,
            subgraph_records: subgraph.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const STATIC_UNIT: &str = r#"<mubin><Objs>
  <value HashId="1"><UnitConfigName>A</UnitConfigName>
    <LinksToObj><value DestUnitHashId="2"><DefinitionName>Actor</DefinitionName></value></LinksToObj>
  </value>
  <value HashId="2"><UnitConfigName>B</UnitConfigName>
    <LinksToObj><value DestUnitHashId="3"><DefinitionName>Rail</DefinitionName></value></LinksToObj>
  </value>
  <value HashId="3"><UnitConfigName>C</UnitConfigName></value>
  <value HashId="4"><UnitConfigName>D</UnitConfigName></value>
</Objs></mubin>"#;

    struct Fixture {
        _temp: TempDir,
        config: Config,
        source_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let source_dir = temp.path().join("MainField");
        fs::create_dir_all(&source_dir).unwrap();
        fs::write(source_dir.join("A-1_Static.xml"), STATIC_UNIT).unwrap();

        let mut config = Config::default();
        config.mubingraph.cache_dir = temp.path().join("cache");
        config.sources.insert("main".to_string(), source_dir.clone());
        Fixture { _temp: temp, config, source_dir }
    }

    #[test]
    fn test_source_set_resolves_name_and_path() {
        let fx = fixture();
        let by_name = SourceSet::open("main", &fx.config).unwrap();
        assert_eq!(by_name.name, "main");
        assert_eq!(by_name.documents.len(), 1);

        let by_path = SourceSet::open(fx.source_dir.to_str().unwrap(), &fx.config).unwrap();
        assert_eq!(by_path.name, "MainField");
        assert_eq!(by_path.fingerprint, by_name.fingerprint);

        assert!(matches!(
            SourceSet::open("NoSuchField", &fx.config),
            Err(MubinGraphError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_run_builds_all_artifacts() {
        let fx = fixture();
        let source = SourceSet::open("main", &fx.config).unwrap();
        let pipeline = Pipeline::new(&fx.config);

        let outcome = pipeline.run(&source, HashId::new(1)).unwrap();
        assert!(!outcome.is_empty());
        assert_eq!(outcome.subgraph_records, 3);
        assert!(!outcome.index.as_ref().unwrap().cached);
        assert!(!outcome.subgraph.cached);
        assert!(!outcome.graph.cached);

        let stem = format!("main-{}", &source.fingerprint[..8]);
        let index_path = &outcome.index.as_ref().unwrap().path;
        assert_eq!(*index_path, fx.config.cache_dir().join(format!("{}.json", stem)));
        assert_eq!(
            outcome.subgraph.path,
            fx.config.cache_dir().join(format!("{}_0x00000001.json", stem))
        );
        assert_eq!(
            outcome.graph.path,
            fx.config.cache_dir().join(format!("{}_0x00000001.dot", stem))
        );
        let dot = fs::read_to_string(&outcome.graph.path).unwrap();
        assert_eq!(dot.lines().filter(|l| l.contains(" -> ")).count(), 2);
        assert!(dot.contains("[label=\"Actor\"]"));
        assert!(dot.contains("[label=\"Rail\"]"));
        assert!(!dot.contains("0x00000004"));

        let index: Vec<Object> = pipeline.cache().read_json(&format!("{}.json", stem)).unwrap();
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_second_run_hits_cache() {
        let fx = fixture();
        let source = SourceSet::open("main", &fx.config).unwrap();
        let pipeline = Pipeline::new(&fx.config);
        pipeline.run(&source, HashId::new(1)).unwrap();

        let again = pipeline.run(&source, HashId::new(1)).unwrap();
        assert!(again.index.is_none());
        assert!(again.subgraph.cached);
        assert!(again.graph.cached);
        assert_eq!(again.subgraph_records, 3);

        // a new seed reuses the flat index
        let other = pipeline.run(&source, HashId::new(4)).unwrap();
        assert!(other.index.unwrap().cached);
        assert!(!other.subgraph.cached);
        assert_eq!(other.subgraph_records, 1);
    }

    #[test]
    fn test_source_change_invalidates_every_stage() {
        let fx = fixture();
        let pipeline = Pipeline::new(&fx.config);
        let source = SourceSet::open("main", &fx.config).unwrap();
        pipeline.run(&source, HashId::new(1)).unwrap();

        fs::write(
            fx.source_dir.join("A-1_Dynamic.xml"),
            r#"<mubin><Objs><value HashId="3">
                <LinksToObj><value DestUnitHashId="4"/></LinksToObj>
            </value></Objs></mubin>"#,
        )
        .unwrap();
        let source = SourceSet::open("main", &fx.config).unwrap();
        let outcome = pipeline.run(&source, HashId::new(1)).unwrap();
        assert!(!outcome.index.unwrap().cached);
        assert!(!outcome.subgraph.cached);
        assert!(!outcome.graph.cached);
        // Dynamic (sorted first) duplicates id 3 and pulls D in
        assert_eq!(outcome.subgraph_records, 5);
    }

    #[test]
    fn test_same_basename_sources_do_not_share_artifacts() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("a").join("MainField");
        let second = temp.path().join("b").join("MainField");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("A-1_Static.xml"), STATIC_UNIT).unwrap();
        fs::write(
            second.join("A-1_Static.xml"),
            r#"<mubin><Objs><value HashId="1"><UnitConfigName>Other</UnitConfigName></value></Objs></mubin>"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.mubingraph.cache_dir = temp.path().join("cache");
        let pipeline = Pipeline::new(&config);
        let first = SourceSet::open(first.to_str().unwrap(), &config).unwrap();
        let second = SourceSet::open(second.to_str().unwrap(), &config).unwrap();
        assert_eq!(first.name, second.name);

        let a = pipeline.run(&first, HashId::new(1)).unwrap();
        let b = pipeline.run(&second, HashId::new(1)).unwrap();
        assert_ne!(a.subgraph.path, b.subgraph.path);
        assert_ne!(a.graph.path, b.graph.path);
        assert_eq!(a.subgraph_records, 3);
        assert_eq!(b.subgraph_records, 1);

        // alternating between them keeps both cached
        let a_again = pipeline.run(&first, HashId::new(1)).unwrap();
        let b_again = pipeline.run(&second, HashId::new(1)).unwrap();
        assert!(a_again.subgraph.cached && a_again.graph.cached);
        assert!(b_again.subgraph.cached && b_again.graph.cached);
        assert_eq!(a_again.subgraph_records, 3);
        assert_eq!(b_again.subgraph_records, 1);
    }

    #[test]
    fn test_force_rebuilds() {
        let fx = fixture();
        let source = SourceSet::open("main", &fx.config).unwrap();
        Pipeline::new(&fx.config).run(&source, HashId::new(1)).unwrap();

        let outcome = Pipeline::new(&fx.config).force(true).run(&source, HashId::new(1)).unwrap();
        assert!(!outcome.index.unwrap().cached);
        assert!(!outcome.subgraph.cached);
        assert!(!outcome.graph.cached);
    }

    #[test]
    fn test_render_options_change_only_rerenders() {
        let fx = fixture();
        let source = SourceSet::open("main", &fx.config).unwrap();
        Pipeline::new(&fx.config).run(&source, HashId::new(1)).unwrap();

        let options = RenderOptions { rankdir: "TB".to_string(), ..RenderOptions::default() };
        let outcome = Pipeline::new(&fx.config)
            .render_options(options)
            .run(&source, HashId::new(1))
            .unwrap();
        assert!(outcome.subgraph.cached);
        assert!(!outcome.graph.cached);
        assert!(fs::read_to_string(&outcome.graph.path).unwrap().contains("rankdir=TB;"));
    }

    #[test]
    fn test_absent_seed_yields_empty_outcome() {
        let fx = fixture();
        let source = SourceSet::open("main", &fx.config).unwrap();
        let outcome = Pipeline::new(&fx.config).run(&source, HashId::new(99)).unwrap();
        assert!(outcome.is_empty());
        let filtered: Vec<Object> = serde_json::from_str(
            &fs::read_to_string(&outcome.subgraph.path).unwrap(),
        )
        .unwrap();
        assert!(filtered.is_empty());
        let dot = fs::read_to_string(&outcome.graph.path).unwrap();
        assert!(!dot.contains("label=\""));
    }
}
