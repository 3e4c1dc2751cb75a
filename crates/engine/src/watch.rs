//! Watch-based assertion core shared by `CheckObj` and `CheckPod`: races a
//! synchronous first pass against an informer stream under a deadline,
//! succeeding the instant the outstanding set empties (spec §4.7/§4.10/§5).
//!
//! Built on `kube::runtime::watcher` + `WatchStreamExt::applied_objects()`
//! in place of the original's hand-rolled `k8s.io/client-go` informer
//! (`pkg/utils/informers.go`); the teacher's controllers drive the same
//! `watcher`/`Controller` combinator (`controller::tasks::mod`).

use crate::error::{Error, Result};
use futures::StreamExt;
use kube::api::{Api, DynamicObject, ListParams};
use kube::runtime::watcher;
use kube::runtime::WatchStreamExt;
use std::collections::HashSet;
use std::time::Duration;

/// Runs `check` once against a synchronous list; if unsatisfied and a
/// deadline is given, keeps applying `check` to every subsequent watch
/// event until the outstanding set empties or the deadline elapses.
///
/// `check` mutates `outstanding`, removing entries it judges satisfied.
/// Every exit path (success, timeout) drops the watch stream, closing it.
pub async fn watch_until_satisfied<F>(
    api: &Api<DynamicObject>,
    list_params: ListParams,
    deadline: Option<Duration>,
    mut outstanding: HashSet<String>,
    mut check: F,
) -> Result<()>
where
    F: FnMut(&DynamicObject, &mut HashSet<String>),
{
    let initial = api.list(&list_params).await?;
    for obj in &initial.items {
        check(obj, &mut outstanding);
    }
    if outstanding.is_empty() {
        return Ok(());
    }

    let Some(deadline) = deadline else {
        return Err(Error::Assertion(
            "check".into(),
            format!("unmatched: {:?}", sorted(&outstanding)),
        ));
    };

    let mut watcher_cfg = watcher::Config::default();
    if let Some(selector) = &list_params.field_selector {
        watcher_cfg = watcher_cfg.fields(selector);
    }
    if let Some(selector) = &list_params.label_selector {
        watcher_cfg = watcher_cfg.labels(selector);
    }
    let stream = watcher::watcher(api.clone(), watcher_cfg).applied_objects();
    tokio::pin!(stream);

    let result = tokio::time::timeout(deadline, async {
        while let Some(event) = stream.next().await {
            if let Ok(obj) = event {
                check(&obj, &mut outstanding);
                if outstanding.is_empty() {
                    return;
                }
            }
        }
    })
    .await;

    if outstanding.is_empty() {
        return Ok(());
    }

    match result {
        Ok(()) => Err(Error::Assertion(
            "check".into(),
            format!("watch stream ended with unmatched: {:?}", sorted(&outstanding)),
        )),
        Err(_) => Err(Error::DeadlineExceeded(
            "check".into(),
            sorted(&outstanding),
        )),
    }
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut v: Vec<String> = set.iter().cloned().collect();
    v.sort();
    v
}
