//! `Register`: loads and splits an object template, parses each
//! document's GVK, resolves GVRs via discovery at execution time, and
//! publishes the resulting `RegisteredType` under its own task id (spec
//! §4.3). Grounded on `newRegisterObjTask`/`RegisterObjTask.Exec`
//! (`pkg/engine/register_object_task.go`).

use super::{task_label, Runnable};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::template::{parse_gvk, split_documents};
use crate::types::{CompiledDocument, Gvr, RegisteredType};
use async_trait::async_trait;
use fleetbench_config::Task;
use kube::discovery::Discovery;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Params {
    template: String,
    #[serde(default, rename = "nameFormat")]
    name_format: String,
    #[serde(default, rename = "podNameFormat")]
    pod_name_format: Option<String>,
    #[serde(default, rename = "podCountExpr")]
    pod_count_expr: Option<String>,
}

pub struct RegisterObjTask {
    id: String,
    documents: Vec<CompiledDocument>,
    template_path: String,
    name_format: String,
    pod_name_format: Option<String>,
    pod_count_expr: Option<String>,
}

impl RegisterObjTask {
    pub fn new(cfg: &Task) -> Result<Self> {
        let params: Params = serde_json::from_value(cfg.params.clone())?;

        if params.template.is_empty() {
            return Err(Error::Validation(cfg.id.clone(), "must specify template".into()));
        }
        let source = std::fs::read_to_string(&params.template).map_err(|e| {
            Error::Validation(
                cfg.id.clone(),
                format!("failed to read {}: {e}", params.template),
            )
        })?;

        let documents: Vec<CompiledDocument> = split_documents(&source)
            .into_iter()
            .map(|doc| {
                let gvk = parse_gvk(&doc)?;
                Ok(CompiledDocument { source: doc, gvk })
            })
            .collect::<Result<_>>()?;

        if documents.is_empty() {
            return Err(Error::Validation(
                cfg.id.clone(),
                format!("template {} contains no documents", params.template),
            ));
        }

        if params.name_format.is_empty() {
            return Err(Error::Validation(cfg.id.clone(), "must specify nameFormat".into()));
        }

        match (&params.pod_name_format, &params.pod_count_expr) {
            (Some(_), Some(_)) | (None, None) => {}
            (Some(_), None) => {
                return Err(Error::Validation(
                    cfg.id.clone(),
                    "must define podCount with podNameFormat".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::Validation(
                    cfg.id.clone(),
                    "must define podNameFormat with podCount".into(),
                ))
            }
        }

        Ok(Self {
            id: cfg.id.clone(),
            documents,
            template_path: params.template,
            name_format: params.name_format,
            pod_name_format: params.pod_name_format,
            pod_count_expr: params.pod_count_expr,
        })
    }
}

#[async_trait]
impl Runnable for RegisterObjTask {
    fn id(&self) -> String {
        task_label("Register", &self.id)
    }

    async fn exec(&self, ctx: &Context) -> Result<()> {
        let mut gvr = Vec::with_capacity(self.documents.len());
        let mut discovery_cache: Option<Discovery> = None;

        for doc in &self.documents {
            if doc.gvk.group == "batch" && doc.gvk.version == "v1" && doc.gvk.kind == "Job" {
                gvr.push(Gvr {
                    group: "batch".to_string(),
                    version: "v1".to_string(),
                    resource: "jobs".to_string(),
                });
                continue;
            }

            if discovery_cache.is_none() {
                discovery_cache = Some(Discovery::new(ctx.client.clone()).run().await?);
            }
            let discovery = discovery_cache.as_ref().expect("populated above");

            let resolved = discovery.groups().find_map(|group| {
                group.resources_by_stability().into_iter().find_map(|(ar, _caps)| {
                    (ar.group == doc.gvk.group && ar.kind == doc.gvk.kind).then(|| Gvr {
                        group: ar.group.clone(),
                        version: ar.version.clone(),
                        resource: ar.plural.clone(),
                    })
                })
            });

            match resolved {
                Some(r) => gvr.push(r),
                None => {
                    return Err(Error::Validation(
                        self.id.clone(),
                        format!(
                            "failed to find resource for {}/{} kind {}",
                            doc.gvk.group, doc.gvk.version, doc.gvk.kind
                        ),
                    ))
                }
            }
        }

        ctx.registry.set_type(
            &self.id,
            RegisteredType {
                template_path: self.template_path.clone(),
                documents: self.documents.clone(),
                gvr,
                name_format: self.name_format.clone(),
                pod_name_format: self.pod_name_format.clone(),
                pod_count_expr: self.pod_count_expr.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_both_pod_fields_or_neither() {
        let dir = tempdir();
        let template = dir.join("t.yml");
        std::fs::write(&template, "apiVersion: batch/v1\nkind: Job\n").unwrap();

        let cfg = Task {
            id: "r1".into(),
            task_type: "Register".into(),
            description: String::new(),
            params: serde_json::json!({
                "template": template.to_string_lossy(),
                "nameFormat": "job{{_ENUM_}}",
                "podNameFormat": "{{_NAME_}}-[0-9]+",
            }),
        };
        assert!(RegisterObjTask::new(&cfg).is_err());
    }

    #[test]
    fn splits_and_parses_multi_document_template() {
        let dir = tempdir();
        let template = dir.join("t.yml");
        std::fs::write(
            &template,
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: batch/v1\nkind: Job\nmetadata:\n  name: b\n",
        )
        .unwrap();

        let cfg = Task {
            id: "r1".into(),
            task_type: "Register".into(),
            description: String::new(),
            params: serde_json::json!({
                "template": template.to_string_lossy(),
                "nameFormat": "job{{_ENUM_}}",
            }),
        };
        let task = RegisterObjTask::new(&cfg).unwrap();
        assert_eq!(task.documents.len(), 2);
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("fb-register-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
