use std::sync::Arc;

use chrono::Utc;
use prov_repo::Repo;
use prov_types::{
    Artifact, ArtifactBuilder, ArtifactSet, Blake3Hasher, ContentId, FunctionSignature, IdHasher,
    Input, Inputs,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::call::{BoundArgs, CallArgs};
use crate::error::SdkResult;

/// Runs functions through a repo, memoizing each result as an artifact.
///
/// A call's artifact id depends only on the function's name, version, and
/// bound inputs. If the repo already holds that id the stored artifact is
/// returned and the computation is skipped.
#[derive(Clone)]
pub struct Provenance {
    repo: Arc<dyn Repo>,
    hasher: Arc<dyn IdHasher>,
}

impl Provenance {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self {
            repo,
            hasher: Arc::new(Blake3Hasher),
        }
    }

    /// Derive identifiers with `hasher` instead of the default BLAKE3.
    pub fn with_hasher(mut self, hasher: Arc<dyn IdHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn repo(&self) -> &Arc<dyn Repo> {
        &self.repo
    }

    /// The artifact id a call would produce, without running it.
    pub fn artifact_id(&self, signature: &FunctionSignature, args: CallArgs) -> SdkResult<ContentId> {
        let inputs = signature.bind(args.positional, args.keywords)?;
        Ok(self
            .hasher
            .artifact_id(&signature.name, signature.version, &inputs))
    }

    /// Return the memoized artifact for this call, computing it if absent.
    ///
    /// Artifact arguments are resolved to their stored values before
    /// `compute` runs. A concurrent caller storing the same id first is not
    /// an error: its artifact is returned instead.
    pub fn call<F>(
        &self,
        signature: &FunctionSignature,
        args: CallArgs,
        compute: F,
    ) -> SdkResult<Artifact>
    where
        F: FnOnce(&BoundArgs) -> SdkResult<Value>,
    {
        let inputs = signature.bind(args.positional, args.keywords)?;
        let id = self
            .hasher
            .artifact_id(&signature.name, signature.version, &inputs);

        match self.repo.get_by_id(&id) {
            Ok(artifact) => {
                debug!(function = %signature.name, id = %id.short(), "cache hit");
                return Ok(artifact);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let bound = self.resolve(&inputs)?;
        let value = compute(&bound)?;
        let artifact = ArtifactBuilder::new(signature.name.clone(), value)
            .version(signature.version)
            .inputs(inputs)
            .computed_at(Utc::now())
            .build_with(self.hasher.as_ref());

        match self.repo.put(&artifact) {
            Ok(()) => {
                info!(function = %signature.name, id = %artifact.id.short(), "artifact computed");
                Ok(artifact)
            }
            Err(e) if e.is_key_exists() => {
                debug!(function = %signature.name, id = %artifact.id.short(), "lost put race");
                Ok(self.repo.get_by_id(&artifact.id)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store a named set of artifacts. Returns the existing set if an
    /// identical one is already stored.
    pub fn collect(&self, name: &str, artifacts: &[&Artifact]) -> SdkResult<ArtifactSet> {
        let ids = artifacts.iter().map(|a| a.id.clone()).collect();
        let set = ArtifactSet::build(ids, Some(name.to_string()), self.hasher.as_ref());
        match self.repo.put_set(&set) {
            Ok(()) => {
                debug!(name, id = %set.id.short(), members = set.len(), "artifact set stored");
                Ok(set)
            }
            Err(e) if e.is_key_exists() => Ok(self.repo.get_set_by_id(&set.id)?),
            Err(e) => Err(e.into()),
        }
    }

    /// Ids of every artifact upstream of `id`, nearest first, each once.
    pub fn lineage(&self, id: &ContentId) -> SdkResult<Vec<ContentId>> {
        let mut seen: Vec<ContentId> = Vec::new();
        let mut frontier = vec![id.clone()];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for current in frontier {
                for parent in self.repo.get_inputs(&current)?.artifact_ids() {
                    if !seen.contains(&parent) {
                        seen.push(parent.clone());
                        next.push(parent);
                    }
                }
            }
            frontier = next;
        }
        Ok(seen)
    }

    fn resolve(&self, inputs: &Inputs) -> SdkResult<BoundArgs> {
        let mut bound = BoundArgs::default();
        for (name, input) in inputs.kwargs() {
            bound.kwargs.insert(name.to_string(), self.resolve_one(input)?);
        }
        for input in inputs.varargs() {
            bound.varargs.push(self.resolve_one(input)?);
        }
        Ok(bound)
    }

    fn resolve_one(&self, input: &Input) -> SdkResult<Value> {
        match input {
            Input::Literal(value) => Ok(value.clone()),
            Input::Artifact(proxy) => Ok(self.repo.get_value(&proxy.id)?),
        }
    }
}

impl std::fmt::Debug for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provenance")
            .field("repo", &self.repo.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use chrono::{DateTime, TimeZone};
    use prov_repo::{
        ChainedRepo, DatabaseConfig, DatabaseRepo, MemoryRepo, RepoError, RepoPermissions,
    };
    use prov_store::InMemoryBlobStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn add_to_each(data: &Value, inc: i64) -> SdkResult<Value> {
        let items = data["data"]
            .as_array()
            .ok_or_else(|| SdkError::compute("data is not a list"))?;
        let shifted: Vec<Value> = items
            .iter()
            .map(|v| json!(v.as_i64().unwrap_or_default() + inc))
            .collect();
        Ok(json!(shifted))
    }

    /// load -> (process_x, process_y) -> combine, counting real computations.
    struct Pipeline {
        prov: Provenance,
        computed: AtomicUsize,
        load: FunctionSignature,
        process_x: FunctionSignature,
        process_y: FunctionSignature,
        combine: FunctionSignature,
    }

    struct PipelineRun {
        data: Artifact,
        inc_x: Artifact,
        inc_y: Artifact,
        res: Artifact,
    }

    impl Pipeline {
        fn new(repo: Arc<dyn Repo>) -> Self {
            Self {
                prov: Provenance::new(repo),
                computed: AtomicUsize::new(0),
                load: FunctionSignature::new("initial_data")
                    .param("filename")
                    .param("timestamp"),
                process_x: FunctionSignature::new("process_data_X")
                    .param("data")
                    .param("process_x_inc")
                    .param("timestamp"),
                process_y: FunctionSignature::new("process_data_Y")
                    .param("data")
                    .param("process_y_inc")
                    .param("timestamp"),
                combine: FunctionSignature::new("combine_processed_data")
                    .param("filename")
                    .param("inc_x")
                    .param("inc_y")
                    .param("timestamp"),
            }
        }

        fn run(&self, filename: &str, timestamp: DateTime<Utc>, x_inc: i64, y_inc: i64) -> PipelineRun {
            let data = self
                .prov
                .call(&self.load, CallArgs::new().arg(filename).arg(timestamp), |args| {
                    self.computed.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({ "data": [1, 2, 3], "timestamp": args.value("timestamp")? }))
                })
                .unwrap();

            let process = |signature: &FunctionSignature, inc_name: &str, inc: i64| {
                let args = CallArgs::new()
                    .arg(&data)
                    .kwarg("timestamp", timestamp)
                    .kwarg(inc_name, inc);
                self.prov
                    .call(signature, args, |args| {
                        self.computed.fetch_add(1, Ordering::SeqCst);
                        let shifted = add_to_each(args.value("data")?, args.i64(inc_name)?)?;
                        Ok(json!({ "data": shifted, "timestamp": args.value("timestamp")? }))
                    })
                    .unwrap()
            };
            let inc_x = process(&self.process_x, "process_x_inc", x_inc);
            let inc_y = process(&self.process_y, "process_y_inc", y_inc);

            let args = CallArgs::new()
                .arg(filename)
                .arg(&inc_x)
                .arg(&inc_y)
                .arg(timestamp);
            let res = self
                .prov
                .call(&self.combine, args, |args| {
                    self.computed.fetch_add(1, Ordering::SeqCst);
                    let xs = args.value("inc_x")?["data"].as_array().cloned().unwrap_or_default();
                    let ys = args.value("inc_y")?["data"].as_array().cloned().unwrap_or_default();
                    let sums: Vec<i64> = xs
                        .iter()
                        .zip(&ys)
                        .map(|(a, b)| a.as_i64().unwrap_or_default() + b.as_i64().unwrap_or_default())
                        .collect();
                    Ok(json!({ "data": sums, "timestamp": args.value("timestamp")? }))
                })
                .unwrap();

            PipelineRun { data, inc_x, inc_y, res }
        }
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 9, 27, 7, 51, 11).unwrap() + chrono::Duration::microseconds(613_544)
    }

    // ---- reproducibility ----

    #[test]
    fn pipeline_is_reproducible_and_memoized() {
        let repo: Arc<dyn Repo> = Arc::new(MemoryRepo::new());
        let pipeline = Pipeline::new(repo.clone());
        let now = timestamp();

        let first = pipeline.run("foo-bar", now, 5, 10);
        assert_eq!(pipeline.computed.load(Ordering::SeqCst), 4);
        assert_eq!(first.res.value["data"], json!([17, 19, 21]));

        let expected = json!({
            "filename": "foo-bar",
            "inc_x": {
                "id": first.inc_x.id.as_str(),
                "name": "process_data_X",
                "type": "ArtifactProxy"
            },
            "inc_y": {
                "id": first.inc_y.id.as_str(),
                "name": "process_data_Y",
                "type": "ArtifactProxy"
            },
            "timestamp": "2016-09-27T07:51:11.613544Z",
            "__varargs": []
        });
        assert_eq!(first.res.inputs_json(), expected);

        let second = pipeline.run("foo-bar", now, 5, 10);
        assert_eq!(pipeline.computed.load(Ordering::SeqCst), 4);
        assert_eq!(second.res.inputs_json(), expected);
        assert_eq!(second.res.id, first.res.id);
        assert_eq!(second.data.id, first.data.id);
        assert_eq!(repo.artifact_ids().unwrap().len(), 4);
    }

    #[test]
    fn inputs_are_recorded_in_declared_order() {
        let pipeline = Pipeline::new(Arc::new(MemoryRepo::new()));
        let run = pipeline.run("foo-bar", timestamp(), 5, 10);
        let keys: Vec<String> = run
            .inc_x
            .inputs_json()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["data", "process_x_inc", "timestamp", "__varargs"]);
    }

    #[test]
    fn changed_argument_recomputes_downstream_only() {
        let pipeline = Pipeline::new(Arc::new(MemoryRepo::new()));
        let now = timestamp();
        let first = pipeline.run("foo-bar", now, 5, 10);
        let second = pipeline.run("foo-bar", now, 5, 11);

        assert_eq!(pipeline.computed.load(Ordering::SeqCst), 6);
        assert_eq!(second.inc_x.id, first.inc_x.id);
        assert_ne!(second.inc_y.id, first.inc_y.id);
        assert_ne!(second.res.id, first.res.id);
    }

    #[test]
    fn memoization_survives_database_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let open = || -> Arc<dyn Repo> {
            Arc::new(DatabaseRepo::open(DatabaseConfig::new(dir.path().join("journal"))).unwrap())
        };

        let first = Pipeline::new(open()).run("foo-bar", timestamp(), 5, 10);
        let pipeline = Pipeline::new(open());
        let second = pipeline.run("foo-bar", timestamp(), 5, 10);
        assert_eq!(pipeline.computed.load(Ordering::SeqCst), 0);
        assert_eq!(second.res, first.res);
    }

    #[test]
    fn chained_cache_fills_front_layer() {
        let archive = Arc::new(MemoryRepo::new().with_name("archive"));
        let first = Pipeline::new(archive.clone()).run("foo-bar", timestamp(), 5, 10);

        archive.permissions().set_all(RepoPermissions::read_only());
        let cache = Arc::new(
            MemoryRepo::new()
                .with_name("cache")
                .with_blobstore(Arc::new(InMemoryBlobStore::new())),
        );
        let members = vec![cache.clone() as Arc<dyn Repo>, archive as Arc<dyn Repo>];
        let chained: Arc<dyn Repo> = Arc::new(ChainedRepo::new(members));
        let pipeline = Pipeline::new(chained);
        pipeline.run("foo-bar", timestamp(), 5, 10);

        assert_eq!(pipeline.computed.load(Ordering::SeqCst), 0);
        assert!(cache.contains(&first.res.id).unwrap());
    }

    // ---- facade details ----

    #[test]
    fn artifact_id_matches_call_result() {
        let prov = Provenance::new(Arc::new(MemoryRepo::new()));
        let sig = FunctionSignature::new("square").version(2).param("x");
        let predicted = prov.artifact_id(&sig, CallArgs::new().arg(4)).unwrap();
        let artifact = prov
            .call(&sig, CallArgs::new().kwarg("x", 4), |args| Ok(json!(args.i64("x")? * args.i64("x")?)))
            .unwrap();
        assert_eq!(artifact.id, predicted);
        assert_eq!(artifact.version, 2);
        assert_eq!(artifact.value, json!(16));
        assert!(artifact.computed_at.is_some());
        assert!(artifact.verify_with(&Blake3Hasher));
    }

    #[test]
    fn varargs_are_resolved() {
        let prov = Provenance::new(Arc::new(MemoryRepo::new()));
        let constant = FunctionSignature::new("constant").param("v");
        let a = prov.call(&constant, CallArgs::new().arg(2), |args| Ok(args.value("v")?.clone())).unwrap();
        let b = prov.call(&constant, CallArgs::new().arg(3), |args| Ok(args.value("v")?.clone())).unwrap();

        let total = FunctionSignature::new("total").param("start").varargs("rest");
        let sum = prov
            .call(&total, CallArgs::new().arg(1).arg(&a).arg(&b), |args| {
                let rest: i64 = args.varargs().iter().filter_map(Value::as_i64).sum();
                Ok(json!(args.i64("start")? + rest))
            })
            .unwrap();
        assert_eq!(sum.value, json!(6));
        assert_eq!(sum.inputs_json()["__varargs"][0]["type"], "ArtifactProxy");
        assert_eq!(prov.lineage(&sum.id).unwrap(), vec![a.id, b.id]);
    }

    #[test]
    fn compute_errors_store_nothing() {
        let repo: Arc<dyn Repo> = Arc::new(MemoryRepo::new());
        let prov = Provenance::new(repo.clone());
        let sig = FunctionSignature::new("fails").param("x");
        let err = prov
            .call(&sig, CallArgs::new().arg(1), |_| Err(SdkError::compute("boom")))
            .unwrap_err();
        assert!(matches!(err, SdkError::Compute(ref m) if m == "boom"));
        assert!(repo.artifact_ids().unwrap().is_empty());
    }

    #[test]
    fn binding_errors_surface_before_compute() {
        let prov = Provenance::new(Arc::new(MemoryRepo::new()));
        let sig = FunctionSignature::new("strict").param("x");
        let err = prov
            .call(&sig, CallArgs::new().kwarg("y", 1), |_| unreachable!())
            .unwrap_err();
        assert!(matches!(err, SdkError::Call(_)));
    }

    #[test]
    fn read_only_repo_reports_permission_error() {
        let repo = Arc::new(MemoryRepo::new().with_permissions(RepoPermissions::read_only()));
        let prov = Provenance::new(repo);
        let sig = FunctionSignature::new("f").param("x");
        let err = prov.call(&sig, CallArgs::new().arg(1), |_| Ok(json!(null))).unwrap_err();
        assert!(matches!(err, SdkError::Repo(RepoError::PermissionDenied { .. })));
    }

    #[test]
    fn collect_stores_named_set() {
        let repo: Arc<dyn Repo> = Arc::new(MemoryRepo::new());
        let prov = Provenance::new(repo.clone());
        let sig = FunctionSignature::new("id").param("x");
        let a = prov.call(&sig, CallArgs::new().arg(1), |args| Ok(args.value("x")?.clone())).unwrap();
        let b = prov.call(&sig, CallArgs::new().arg(2), |args| Ok(args.value("x")?.clone())).unwrap();

        let set = prov.collect("batch", &[&a, &b]).unwrap();
        assert_eq!(repo.get_set_by_name("batch").unwrap(), set);
        assert_eq!(prov.collect("batch", &[&b, &a]).unwrap(), set);
    }
}
