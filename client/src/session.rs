//! # Editing session
//!
//! In-memory mirror of the owner's link collection with optimistic
//! mutations. A mutation is applied to the mirror first, then sent over
//! the wire; the server's answer either confirms it or rolls the mirror
//! back to a snapshot captured *before* the local change. The displayed
//! list never diverges from stored truth by more than the in-flight
//! operations.
//!
//! Completions are gated by a sequence number per (target, kind): when a
//! newer request for the same target starts before an older one resolves,
//! the older completion is ignored entirely — the latest request's
//! outcome is authoritative.
//!
//! Every failed mutation leaves a notice behind for the UI to show; a
//! failure is never silent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use model::{sort_links, CreateLink, Link, LinkPatch};
use tracing::debug;

use crate::api::LinkApi;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient, non-blocking feedback for the UI to drain and display.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum OpKind {
    Reorder,
    Toggle,
    Delete,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Collection,
    Link(String),
}

#[derive(Default)]
struct Inner {
    links: Vec<Link>,
    in_flight: HashMap<(Target, OpKind), u64>,
    next_seq: u64,
    notices: Vec<Notice>,
}

impl Inner {
    fn begin(&mut self, target: Target, kind: OpKind) -> u64 {
        self.next_seq += 1;
        self.in_flight.insert((target, kind), self.next_seq);
        self.next_seq
    }

    /// True while `seq` is still the newest request for this target and
    /// kind. A stale completion must not touch the mirror.
    fn is_current(&self, target: &Target, kind: OpKind, seq: u64) -> bool {
        self.in_flight.get(&(target.clone(), kind)) == Some(&seq)
    }

    fn finish(&mut self, target: &Target, kind: OpKind) {
        self.in_flight.remove(&(target.clone(), kind));
    }

    fn notice(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notices.push(Notice {
            kind,
            message: message.into(),
        });
    }

    fn replace_link(&mut self, link: Link) {
        if let Some(slot) = self.links.iter_mut().find(|l| l.id == link.id) {
            *slot = link;
        }
        sort_links(&mut self.links);
    }
}

pub struct EditorSession {
    api: Arc<dyn LinkApi>,
    inner: Mutex<Inner>,
}

impl EditorSession {
    pub fn new(api: Arc<dyn LinkApi>) -> Self {
        Self {
            api,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Seeds the mirror without a network call.
    pub fn with_links(api: Arc<dyn LinkApi>, mut links: Vec<Link>) -> Self {
        sort_links(&mut links);
        let session = Self::new(api);
        session.inner.lock().unwrap().links = links;
        session
    }

    /// Replaces the mirror with the server's current list.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let mut links = self.api.list().await?;
        sort_links(&mut links);
        self.inner.lock().unwrap().links = links;
        Ok(())
    }

    /// Current displayed list, in display order.
    pub fn links(&self) -> Vec<Link> {
        self.inner.lock().unwrap().links.clone()
    }

    /// True while any mutation of this link is awaiting the server; the
    /// UI disables that link's controls, not the whole list.
    pub fn is_busy(&self, id: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .in_flight
            .keys()
            .any(|(target, _)| matches!(target, Target::Link(l) if l == id))
    }

    pub fn is_reordering(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .in_flight
            .contains_key(&(Target::Collection, OpKind::Reorder))
    }

    /// Drains pending UI notices.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.inner.lock().unwrap().notices)
    }

    /// Appends a link. Not optimistic: the server assigns id and order,
    /// so the mirror is updated from its response.
    pub async fn add(&self, req: CreateLink) -> Result<Link, ClientError> {
        let link = self.api.create(&req).await?;
        let mut inner = self.inner.lock().unwrap();
        inner.links.push(link.clone());
        sort_links(&mut inner.links);
        inner.notice(NoticeKind::Success, "Link added");
        Ok(link)
    }

    /// Drag result: moves the link at `from` to position `to`, shows the
    /// new order immediately, and confirms it with the server. Rolls back
    /// to the pre-drag snapshot on failure. Out-of-range indices are a
    /// local error and never reach the network.
    pub async fn move_link(&self, from: usize, to: usize) -> Result<(), ClientError> {
        let (snapshot, ordered_ids, seq) = {
            let mut inner = self.inner.lock().unwrap();
            let len = inner.links.len();
            if from >= len || to >= len {
                inner.notice(NoticeKind::Error, "Could not move that link");
                return Err(ClientError::InvalidDrag { from, to, len });
            }

            let snapshot = inner.links.clone();
            let moved = inner.links.remove(from);
            inner.links.insert(to, moved);
            for (index, link) in inner.links.iter_mut().enumerate() {
                link.order = index as i64;
            }
            let ordered_ids: Vec<String> = inner.links.iter().map(|l| l.id.clone()).collect();
            let seq = inner.begin(Target::Collection, OpKind::Reorder);
            (snapshot, ordered_ids, seq)
        };

        let result = self.api.reorder(&ordered_ids).await;

        let mut inner = self.inner.lock().unwrap();
        if !inner.is_current(&Target::Collection, OpKind::Reorder, seq) {
            debug!("Ignoring superseded reorder result");
            return Ok(());
        }
        inner.finish(&Target::Collection, OpKind::Reorder);

        match result {
            Ok(()) => {
                inner.notice(NoticeKind::Success, "Order saved");
                Ok(())
            }
            Err(e) => {
                inner.links = snapshot;
                inner.notice(NoticeKind::Error, format!("Could not save the new order: {e}"));
                Err(e)
            }
        }
    }

    /// Flips a link's visibility optimistically.
    pub async fn toggle(&self, id: &str) -> Result<(), ClientError> {
        let (snapshot, active, seq) = {
            let mut inner = self.inner.lock().unwrap();
            let snapshot = inner.links.clone();
            let Some(link) = inner.links.iter_mut().find(|l| l.id == id) else {
                return Err(ClientError::UnknownLink(id.to_string()));
            };
            link.active = !link.active;
            let active = link.active;
            let seq = inner.begin(Target::Link(id.to_string()), OpKind::Toggle);
            (snapshot, active, seq)
        };

        let patch = LinkPatch {
            active: Some(active),
            ..Default::default()
        };
        let result = self.api.patch_link(id, &patch).await;

        let target = Target::Link(id.to_string());
        let mut inner = self.inner.lock().unwrap();
        if !inner.is_current(&target, OpKind::Toggle, seq) {
            debug!("Ignoring superseded toggle result for {id}");
            return Ok(());
        }
        inner.finish(&target, OpKind::Toggle);

        match result {
            Ok(link) => {
                inner.replace_link(link);
                inner.notice(NoticeKind::Success, "Link updated");
                Ok(())
            }
            Err(e) => {
                inner.links = snapshot;
                inner.notice(NoticeKind::Error, format!("Could not update the link: {e}"));
                Err(e)
            }
        }
    }

    /// Deletes a link optimistically. Remaining links keep their order
    /// values; display order is unaffected by the gap.
    pub async fn remove(&self, id: &str) -> Result<(), ClientError> {
        let (snapshot, seq) = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.links.iter().any(|l| l.id == id) {
                return Err(ClientError::UnknownLink(id.to_string()));
            }
            let snapshot = inner.links.clone();
            inner.links.retain(|l| l.id != id);
            let seq = inner.begin(Target::Link(id.to_string()), OpKind::Delete);
            (snapshot, seq)
        };

        let result = self.api.delete_link(id).await;

        let target = Target::Link(id.to_string());
        let mut inner = self.inner.lock().unwrap();
        if !inner.is_current(&target, OpKind::Delete, seq) {
            debug!("Ignoring superseded delete result for {id}");
            return Ok(());
        }
        inner.finish(&target, OpKind::Delete);

        match result {
            Ok(()) => {
                inner.notice(NoticeKind::Success, "Link deleted");
                Ok(())
            }
            Err(e) => {
                inner.links = snapshot;
                inner.notice(NoticeKind::Error, format!("Could not delete the link: {e}"));
                Err(e)
            }
        }
    }

    /// Attaches an uploaded image to a link. The upload transport hands
    /// us the final URL; this only patches it in. On success the mirror
    /// is re-fetched, since another session may have mutated the
    /// collection while the upload ran.
    pub async fn attach_image(&self, id: &str, image_url: &str) -> Result<(), ClientError> {
        let (snapshot, seq) = {
            let mut inner = self.inner.lock().unwrap();
            let snapshot = inner.links.clone();
            let Some(link) = inner.links.iter_mut().find(|l| l.id == id) else {
                return Err(ClientError::UnknownLink(id.to_string()));
            };
            link.image_url = Some(image_url.to_string());
            let seq = inner.begin(Target::Link(id.to_string()), OpKind::Image);
            (snapshot, seq)
        };

        let patch = LinkPatch {
            image_url: Some(Some(image_url.to_string())),
            ..Default::default()
        };
        let result = self.api.patch_link(id, &patch).await;

        let target = Target::Link(id.to_string());
        {
            let mut inner = self.inner.lock().unwrap();
            if !inner.is_current(&target, OpKind::Image, seq) {
                debug!("Ignoring superseded image attach result for {id}");
                return Ok(());
            }
            inner.finish(&target, OpKind::Image);

            if let Err(e) = result {
                inner.links = snapshot;
                inner.notice(NoticeKind::Error, format!("Could not attach the image: {e}"));
                return Err(e);
            }
            inner.notice(NoticeKind::Success, "Image attached");
        }

        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use model::LinkKind;
    use tokio::sync::oneshot;

    use super::*;

    fn link(id: &str, order: i64) -> Link {
        Link {
            id: id.to_string(),
            owner_id: "owner".to_string(),
            title: format!("link {id}"),
            url: "https://example.com".to_string(),
            kind: LinkKind::Regular,
            image_url: None,
            order,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn rejected() -> ClientError {
        ClientError::Rejected {
            status: 500,
            message: "boom".to_string(),
        }
    }

    fn ids(links: &[Link]) -> Vec<String> {
        links.iter().map(|l| l.id.clone()).collect()
    }

    /// Fake API answering each call from a pre-loaded script.
    #[derive(Default)]
    struct ScriptedApi {
        list_results: Mutex<VecDeque<Result<Vec<Link>, ClientError>>>,
        patch_results: Mutex<VecDeque<Result<Link, ClientError>>>,
        delete_results: Mutex<VecDeque<Result<(), ClientError>>>,
        reorder_results: Mutex<VecDeque<Result<(), ClientError>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LinkApi for ScriptedApi {
        async fn list(&self) -> Result<Vec<Link>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.list_results.lock().unwrap().pop_front().expect("unscripted list")
        }

        async fn create(&self, _req: &CreateLink) -> Result<Link, ClientError> {
            unreachable!("unscripted create")
        }

        async fn patch_link(&self, _id: &str, _patch: &LinkPatch) -> Result<Link, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.patch_results.lock().unwrap().pop_front().expect("unscripted patch")
        }

        async fn delete_link(&self, _id: &str) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.delete_results.lock().unwrap().pop_front().expect("unscripted delete")
        }

        async fn reorder(&self, _ordered_ids: &[String]) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reorder_results.lock().unwrap().pop_front().expect("unscripted reorder")
        }
    }

    /// Fake API whose reorder calls block until the test releases them,
    /// so completion order is under test control.
    #[derive(Default)]
    struct GatedApi {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<(), ClientError>>>>,
        calls: AtomicUsize,
    }

    impl GatedApi {
        fn gate(&self) -> oneshot::Sender<Result<(), ClientError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }
    }

    #[async_trait]
    impl LinkApi for GatedApi {
        async fn list(&self) -> Result<Vec<Link>, ClientError> {
            unreachable!("unscripted list")
        }

        async fn create(&self, _req: &CreateLink) -> Result<Link, ClientError> {
            unreachable!("unscripted create")
        }

        async fn patch_link(&self, _id: &str, _patch: &LinkPatch) -> Result<Link, ClientError> {
            unreachable!("unscripted patch")
        }

        async fn delete_link(&self, _id: &str) -> Result<(), ClientError> {
            unreachable!("unscripted delete")
        }

        async fn reorder(&self, _ordered_ids: &[String]) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().unwrap().pop_front().expect("no gate armed");
            gate.await.expect("gate dropped")
        }
    }

    async fn wait_for_calls(api: &GatedApi, count: usize) {
        while api.calls.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn successful_drag_keeps_optimistic_order() {
        let api = Arc::new(ScriptedApi::default());
        api.reorder_results.lock().unwrap().push_back(Ok(()));
        let session = EditorSession::with_links(
            api.clone(),
            vec![link("a", 0), link("b", 1), link("c", 2)],
        );

        session.move_link(2, 0).await.unwrap();

        let links = session.links();
        assert_eq!(ids(&links), ["c", "a", "b"]);
        let orders: Vec<i64> = links.iter().map(|l| l.order).collect();
        assert_eq!(orders, [0, 1, 2]);

        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Success);
    }

    #[tokio::test]
    async fn failed_drag_rolls_back_to_the_snapshot() {
        let api = Arc::new(ScriptedApi::default());
        api.reorder_results.lock().unwrap().push_back(Err(rejected()));
        let before = vec![link("a", 0), link("b", 1), link("c", 2)];
        let session = EditorSession::with_links(api.clone(), before.clone());

        let err = session.move_link(0, 2).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));

        // Displayed list equals the pre-mutation snapshot, not the
        // optimistic (failed) one.
        assert_eq!(session.links(), before);

        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert!(!session.is_reordering());
    }

    #[tokio::test]
    async fn out_of_range_drag_never_reaches_the_network() {
        let api = Arc::new(ScriptedApi::default());
        let session =
            EditorSession::with_links(api.clone(), vec![link("a", 0), link("b", 1)]);

        let err = session.move_link(0, 5).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidDrag { .. }));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ids(&session.links()), ["a", "b"]);
    }

    #[tokio::test]
    async fn newer_reorder_supersedes_an_older_in_flight_one() {
        let api = Arc::new(GatedApi::default());
        let first_gate = api.gate();
        let second_gate = api.gate();
        let session = Arc::new(EditorSession::with_links(
            api.clone(),
            vec![link("a", 0), link("b", 1), link("c", 2)],
        ));

        let s1 = session.clone();
        let first = tokio::spawn(async move { s1.move_link(0, 2).await });
        wait_for_calls(&api, 1).await;

        let s2 = session.clone();
        let second = tokio::spawn(async move { s2.move_link(0, 1).await });
        wait_for_calls(&api, 2).await;

        // The newer request resolves first and wins.
        second_gate.send(Ok(())).unwrap();
        second.await.unwrap().unwrap();
        let settled = session.links();

        // The older request's failure arrives late and is ignored: no
        // rollback, no extra notice.
        first_gate.send(Err(rejected())).unwrap();
        first.await.unwrap().unwrap();

        assert_eq!(session.links(), settled);
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Success);
        assert!(!session.is_reordering());
    }

    #[tokio::test]
    async fn toggle_applies_immediately_and_rolls_back_on_failure() {
        let api = Arc::new(ScriptedApi::default());
        let mut confirmed = link("a", 0);
        confirmed.active = false;
        api.patch_results.lock().unwrap().push_back(Ok(confirmed));
        api.patch_results.lock().unwrap().push_back(Err(rejected()));
        let session = EditorSession::with_links(api.clone(), vec![link("a", 0)]);

        session.toggle("a").await.unwrap();
        assert!(!session.links()[0].active);

        let err = session.toggle("a").await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));
        // Rolled back to the state before the second toggle.
        assert!(!session.links()[0].active);

        let notices = session.take_notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[1].kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn delete_rolls_back_on_failure() {
        let api = Arc::new(ScriptedApi::default());
        api.delete_results.lock().unwrap().push_back(Err(rejected()));
        let before = vec![link("a", 0), link("b", 1)];
        let session = EditorSession::with_links(api.clone(), before.clone());

        session.remove("a").await.unwrap_err();
        assert_eq!(session.links(), before);
        assert!(!session.is_busy("a"));
    }

    #[tokio::test]
    async fn attach_image_refreshes_from_the_server_on_success() {
        let api = Arc::new(ScriptedApi::default());
        let mut patched = link("a", 0);
        patched.image_url = Some("https://cdn/a.png".to_string());
        api.patch_results.lock().unwrap().push_back(Ok(patched.clone()));
        // The refreshed list also carries a link added from another
        // session while the upload ran.
        api.list_results
            .lock()
            .unwrap()
            .push_back(Ok(vec![patched, link("b", 1)]));
        let session = EditorSession::with_links(api.clone(), vec![link("a", 0)]);

        session.attach_image("a", "https://cdn/a.png").await.unwrap();

        let links = session.links();
        assert_eq!(ids(&links), ["a", "b"]);
        assert_eq!(links[0].image_url.as_deref(), Some("https://cdn/a.png"));
    }

    #[tokio::test]
    async fn unknown_link_is_a_local_error() {
        let api = Arc::new(ScriptedApi::default());
        let session = EditorSession::with_links(api.clone(), vec![link("a", 0)]);

        assert!(matches!(
            session.toggle("ghost").await.unwrap_err(),
            ClientError::UnknownLink(_)
        ));
        assert!(matches!(
            session.remove("ghost").await.unwrap_err(),
            ClientError::UnknownLink(_)
        ));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }
}
