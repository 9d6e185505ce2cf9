use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use chrono::{DateTime, Utc};

use crate::commands::{CommandGrammar, Control};
use crate::domain::{SenderId, VendorCode};
use crate::events::{EventKind, InboundEvent, MediaPayload};
use crate::registry::VendorRegistry;

static ASSET_COUNTER: AtomicU64 = AtomicU64::new(1);

/// One media item attached to a draft, already encoded for transit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaAsset {
    pub filename: String,
    pub base64: String,
    pub mime_type: String,
}

/// The in-flight aggregation unit: everything collected for one product
/// so far, owned by exactly one conversation.
#[derive(Clone, Debug)]
pub struct DraftRecord {
    pub sender: SenderId,
    pub vendor: VendorCode,
    pub images: Vec<MediaAsset>,
    pub videos: Vec<MediaAsset>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl DraftRecord {
    fn new(sender: SenderId, vendor: VendorCode, created_at: DateTime<Utc>) -> Self {
        Self {
            sender,
            vendor,
            images: Vec::new(),
            videos: Vec::new(),
            description: String::new(),
            created_at,
        }
    }

    /// Appends media to the bucket selected by MIME prefix. `video/...`
    /// goes to `videos`; everything else (including audio and documents)
    /// is image-bucketed. Insertion order is arrival order and is
    /// meaningful downstream.
    fn append_media(&mut self, payload: &MediaPayload) -> String {
        let is_video = payload.mime_type.starts_with("video/");
        let filename = synthesize_filename(if is_video { "vid" } else { "img" }, &payload.mime_type);

        let asset = MediaAsset {
            filename: filename.clone(),
            base64: base64::engine::general_purpose::STANDARD.encode(&payload.bytes),
            mime_type: payload.mime_type.clone(),
        };

        if is_video {
            self.videos.push(asset);
        } else {
            self.images.push(asset);
        }
        filename
    }

    fn append_text(&mut self, line: &str) {
        self.description.push_str(line);
        self.description.push('\n');
    }

    /// A draft may only be submitted once it carries a real description.
    pub fn is_flushable(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

/// Millisecond timestamp plus a process-wide monotonic counter, so two
/// media events landing in the same millisecond still get distinct names.
fn synthesize_filename(prefix: &str, mime_type: &str) -> String {
    let ts = Utc::now().timestamp_millis();
    let n = ASSET_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}_{ts}_{n}.{}", extension_for(mime_type))
}

fn extension_for(mime_type: &str) -> &str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/3gpp" => "3gp",
        _ => "bin",
    }
}

/// Why an event produced no state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    EmptyEvent,
    EmptyMediaPayload,
    TextWithoutDraft,
    FlushWithoutDraft,
}

/// Result of feeding one event through the state machine.
#[derive(Debug)]
pub enum Outcome {
    Ignored(DropReason),
    MediaCollected { filename: String, started_draft: bool },
    TextCollected,
    VendorSwitched { code: VendorCode, newly_seen: bool },
    DraftStarted { discarded_previous: bool },
    FlushReady(DraftRecord),
    FlushSkippedEmpty,
}

/// The aggregation state machine.
///
/// State is keyed per sender: each conversation has at most one open
/// draft and its own active vendor code, so concurrently active senders
/// can never interleave into each other's product. Every transition is a
/// total function over (state, event); nothing here errors.
///
/// Media policy: accumulate. Media never triggers a flush; only the
/// explicit flush marker closes a draft.
#[derive(Debug)]
pub struct Aggregator {
    grammar: CommandGrammar,
    drafts: HashMap<SenderId, DraftRecord>,
    vendors: HashMap<SenderId, VendorCode>,
    registry: VendorRegistry,
}

impl Aggregator {
    pub fn new(grammar: CommandGrammar) -> Self {
        Self {
            grammar,
            drafts: HashMap::new(),
            vendors: HashMap::new(),
            registry: VendorRegistry::new(),
        }
    }

    pub fn handle(&mut self, event: InboundEvent) -> Outcome {
        match event.kind {
            EventKind::Empty => Outcome::Ignored(DropReason::EmptyEvent),
            EventKind::Media(payload) => self.handle_media(event.sender, payload, event.received_at),
            EventKind::Text(body) => self.handle_text(event.sender, &body, event.received_at),
        }
    }

    fn handle_media(
        &mut self,
        sender: SenderId,
        payload: MediaPayload,
        received_at: DateTime<Utc>,
    ) -> Outcome {
        if payload.is_empty() {
            return Outcome::Ignored(DropReason::EmptyMediaPayload);
        }

        let started_draft = !self.drafts.contains_key(&sender);
        let vendor = self.active_vendor(&sender);
        let draft = self
            .drafts
            .entry(sender.clone())
            .or_insert_with(|| DraftRecord::new(sender, vendor, received_at));

        let filename = draft.append_media(&payload);
        Outcome::MediaCollected {
            filename,
            started_draft,
        }
    }

    fn handle_text(
        &mut self,
        sender: SenderId,
        body: &str,
        received_at: DateTime<Utc>,
    ) -> Outcome {
        // Control detection runs before any description-append logic so
        // control tokens never leak into product text.
        match self.grammar.parse(body) {
            Some(Control::VendorSwitch(code)) => {
                let newly_seen = self.registry.ensure_registered(&code);
                self.vendors.insert(sender, code.clone());
                Outcome::VendorSwitched { code, newly_seen }
            }
            Some(Control::Start) => {
                let discarded_previous = self.drafts.remove(&sender).is_some();
                let vendor = self.active_vendor(&sender);
                self.drafts.insert(
                    sender.clone(),
                    DraftRecord::new(sender, vendor, received_at),
                );
                Outcome::DraftStarted { discarded_previous }
            }
            Some(Control::Flush) => {
                let flushable = match self.drafts.get(&sender) {
                    None => return Outcome::Ignored(DropReason::FlushWithoutDraft),
                    Some(draft) => draft.is_flushable(),
                };
                if !flushable {
                    return Outcome::FlushSkippedEmpty;
                }
                match self.drafts.remove(&sender) {
                    Some(draft) => Outcome::FlushReady(draft),
                    None => Outcome::Ignored(DropReason::FlushWithoutDraft),
                }
            }
            None => match self.drafts.get_mut(&sender) {
                Some(draft) => {
                    if body.is_empty() {
                        return Outcome::Ignored(DropReason::EmptyEvent);
                    }
                    draft.append_text(body);
                    Outcome::TextCollected
                }
                None => Outcome::Ignored(DropReason::TextWithoutDraft),
            },
        }
    }

    /// The sender's currently active vendor code (defaults to the
    /// `DEFAULT` sentinel until a vendor switch is seen).
    pub fn active_vendor(&self, sender: &SenderId) -> VendorCode {
        self.vendors
            .get(sender)
            .cloned()
            .unwrap_or_else(VendorCode::default_code)
    }

    pub fn draft(&self, sender: &SenderId) -> Option<&DraftRecord> {
        self.drafts.get(sender)
    }

    pub fn open_draft_count(&self) -> usize {
        self.drafts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(id: &str) -> SenderId {
        SenderId(id.to_string())
    }

    fn agg() -> Aggregator {
        Aggregator::new(CommandGrammar::default())
    }

    fn media(s: &str, bytes: &[u8], mime: &str) -> InboundEvent {
        InboundEvent::media(sender(s), bytes.to_vec(), mime)
    }

    fn text(s: &str, body: &str) -> InboundEvent {
        InboundEvent::text(sender(s), body)
    }

    #[test]
    fn media_in_idle_opens_a_draft() {
        let mut a = agg();
        let out = a.handle(media("S", b"jpegdata", "image/jpeg"));

        assert!(matches!(
            out,
            Outcome::MediaCollected {
                started_draft: true,
                ..
            }
        ));
        let draft = a.draft(&sender("S")).unwrap();
        assert_eq!(draft.images.len(), 1);
        assert_eq!(draft.vendor, VendorCode::default_code());
    }

    #[test]
    fn text_in_idle_is_dropped() {
        let mut a = agg();
        let out = a.handle(text("S", "orphan line"));
        assert!(matches!(out, Outcome::Ignored(DropReason::TextWithoutDraft)));
        assert!(a.draft(&sender("S")).is_none());
    }

    #[test]
    fn media_arrival_order_is_preserved_and_partitioned_by_mime() {
        let mut a = agg();
        a.handle(media("S", b"a", "image/jpeg"));
        a.handle(media("S", b"b", "video/mp4"));
        a.handle(media("S", b"c", "image/png"));
        a.handle(media("S", b"d", "video/mp4"));

        let draft = a.draft(&sender("S")).unwrap();
        assert_eq!(draft.images.len(), 2);
        assert_eq!(draft.videos.len(), 2);
        assert!(draft.images[0].filename.ends_with(".jpg"));
        assert!(draft.images[1].filename.ends_with(".png"));

        let decode = |asset: &MediaAsset| {
            base64::engine::general_purpose::STANDARD
                .decode(&asset.base64)
                .unwrap()
        };
        assert_eq!(decode(&draft.images[0]), b"a");
        assert_eq!(decode(&draft.images[1]), b"c");
        assert_eq!(decode(&draft.videos[0]), b"b");
        assert_eq!(decode(&draft.videos[1]), b"d");
    }

    #[test]
    fn unknown_media_class_is_image_bucketed() {
        let mut a = agg();
        a.handle(media("S", b"x", "application/pdf"));
        a.handle(media("S", b"y", "audio/ogg"));

        let draft = a.draft(&sender("S")).unwrap();
        assert_eq!(draft.images.len(), 2);
        assert!(draft.videos.is_empty());
        assert!(draft.images[0].filename.ends_with(".bin"));
    }

    #[test]
    fn empty_media_payload_is_dropped_without_mutation() {
        let mut a = agg();
        a.handle(media("S", b"x", "image/jpeg"));
        let out = a.handle(media("S", b"", "image/jpeg"));

        assert!(matches!(
            out,
            Outcome::Ignored(DropReason::EmptyMediaPayload)
        ));
        assert_eq!(a.draft(&sender("S")).unwrap().images.len(), 1);
    }

    #[test]
    fn description_is_newline_joined_in_arrival_order() {
        let mut a = agg();
        a.handle(media("S", b"x", "image/jpeg"));
        a.handle(text("S", "  Red dress  "));
        a.handle(text("S", "Size M"));

        let draft = a.draft(&sender("S")).unwrap();
        assert_eq!(draft.description, "Red dress\nSize M\n");
    }

    #[test]
    fn scenario_a_full_flow_flushes_once() {
        let mut a = agg();
        a.handle(media("S", b"img1", "image/jpeg"));
        a.handle(text("S", "Red dress"));
        a.handle(text("S", "Size M"));
        let out = a.handle(text("S", "✅"));

        let Outcome::FlushReady(record) = out else {
            panic!("expected flush, got {out:?}");
        };
        assert_eq!(record.description, "Red dress\nSize M\n");
        assert_eq!(record.images.len(), 1);
        assert_eq!(a.open_draft_count(), 0);

        // Next media starts a brand-new draft with no leftovers.
        a.handle(media("S", b"img2", "image/jpeg"));
        let fresh = a.draft(&sender("S")).unwrap();
        assert_eq!(fresh.images.len(), 1);
        assert!(fresh.description.is_empty());
    }

    #[test]
    fn scenario_b_flush_with_empty_description_is_a_noop() {
        let mut a = agg();
        a.handle(media("S", b"img1", "image/jpeg"));
        let out = a.handle(text("S", "✅"));

        assert!(matches!(out, Outcome::FlushSkippedEmpty));
        let draft = a.draft(&sender("S")).unwrap();
        assert_eq!(draft.images.len(), 1);
    }

    #[test]
    fn scenario_c_vendor_switch_tags_subsequent_draft() {
        let mut a = agg();
        let out = a.handle(text("S", "vendor ACME"));
        assert!(matches!(
            out,
            Outcome::VendorSwitched {
                newly_seen: true,
                ..
            }
        ));
        // A bare vendor switch does not open a draft.
        assert!(a.draft(&sender("S")).is_none());

        a.handle(media("S", b"img1", "image/jpeg"));
        a.handle(text("S", "desc"));
        let out = a.handle(text("S", "✅"));

        let Outcome::FlushReady(record) = out else {
            panic!("expected flush, got {out:?}");
        };
        assert_eq!(record.vendor, VendorCode::new("ACME"));
    }

    #[test]
    fn vendor_switch_does_not_mutate_an_open_draft() {
        let mut a = agg();
        a.handle(media("S", b"img1", "image/jpeg"));
        a.handle(text("S", "desc"));
        a.handle(text("S", "vendor NEWCO"));

        let draft = a.draft(&sender("S")).unwrap();
        assert_eq!(draft.images.len(), 1);
        assert_eq!(draft.description, "desc\n");
        // The draft keeps the vendor it was created under.
        assert_eq!(draft.vendor, VendorCode::default_code());
        // But the session-level vendor moved.
        assert_eq!(a.active_vendor(&sender("S")), VendorCode::new("NEWCO"));
    }

    #[test]
    fn repeated_vendor_switch_is_not_newly_seen() {
        let mut a = agg();
        assert!(matches!(
            a.handle(text("S", "vendor ACME")),
            Outcome::VendorSwitched {
                newly_seen: true,
                ..
            }
        ));
        assert!(matches!(
            a.handle(text("S", "vendor acme")),
            Outcome::VendorSwitched {
                newly_seen: false,
                ..
            }
        ));
    }

    #[test]
    fn start_command_discards_in_flight_draft_without_flushing() {
        let mut a = agg();
        a.handle(media("S", b"img1", "image/jpeg"));
        a.handle(text("S", "half-finished"));

        let out = a.handle(text("S", "!product"));
        assert!(matches!(
            out,
            Outcome::DraftStarted {
                discarded_previous: true
            }
        ));

        let draft = a.draft(&sender("S")).unwrap();
        assert!(draft.images.is_empty());
        assert!(draft.description.is_empty());
    }

    #[test]
    fn start_command_in_idle_opens_an_empty_draft_accepting_text() {
        let mut a = agg();
        let out = a.handle(text("S", "!product"));
        assert!(matches!(
            out,
            Outcome::DraftStarted {
                discarded_previous: false
            }
        ));

        // Text now lands in the draft even though no media arrived yet.
        a.handle(text("S", "text-only product"));
        assert_eq!(
            a.draft(&sender("S")).unwrap().description,
            "text-only product\n"
        );
    }

    #[test]
    fn flush_marker_with_no_draft_is_ignored() {
        let mut a = agg();
        let out = a.handle(text("S", "✅"));
        assert!(matches!(out, Outcome::Ignored(DropReason::FlushWithoutDraft)));
    }

    #[test]
    fn senders_are_isolated() {
        let mut a = agg();
        a.handle(media("S", b"s-img", "image/jpeg"));
        a.handle(text("S", "s-desc"));
        a.handle(media("T", b"t-img", "image/jpeg"));
        a.handle(text("T", "t-desc"));
        a.handle(text("T", "vendor TCO"));

        let out = a.handle(text("S", "✅"));
        let Outcome::FlushReady(record) = out else {
            panic!("expected flush, got {out:?}");
        };
        assert_eq!(record.description, "s-desc\n");
        assert_eq!(record.vendor, VendorCode::default_code());

        // T's draft is untouched by S's flush.
        let t = a.draft(&sender("T")).unwrap();
        assert_eq!(t.description, "t-desc\n");
        assert_eq!(a.active_vendor(&sender("T")), VendorCode::new("TCO"));
    }

    #[test]
    fn filenames_are_unique_within_the_same_millisecond() {
        let mut a = agg();
        for _ in 0..50 {
            a.handle(media("S", b"x", "image/jpeg"));
        }
        let draft = a.draft(&sender("S")).unwrap();
        let mut names: Vec<_> = draft.images.iter().map(|i| i.filename.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 50);
    }

    #[test]
    fn empty_event_kind_is_ignored() {
        let mut a = agg();
        let out = a.handle(InboundEvent::empty(sender("S")));
        assert!(matches!(out, Outcome::Ignored(DropReason::EmptyEvent)));
    }
}
