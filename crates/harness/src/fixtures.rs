use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use threadview_core::{Action, ActionKind, Collection, MessageFragment, Timestamp};

pub const DEFAULT_SEED: u64 = 0x7e57_5eed;

const WORDS: &[&str] = &[
    "lunch", "invoice", "approved", "receipt", "hotel", "taxi", "please", "review", "thanks",
    "submitted", "flight", "merchant", "total", "card", "today",
];

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn comment(id: u64, ms: u64, text: &str) -> Action {
    Action::new(id, ActionKind::Comment, Timestamp::from_millis(ms)).with_text(text)
}

pub fn closed(id: u64, ms: u64) -> Action {
    Action::new(id, ActionKind::Closed, Timestamp::from_millis(ms))
}

pub fn money_request(id: u64, ms: u64) -> Action {
    Action::new(id, ActionKind::MoneyRequest, Timestamp::from_millis(ms))
        .with_text(format!("requested ${}.00", id % 500 + 1))
}

pub fn to_collection(actions: impl IntoIterator<Item = Action>) -> Arc<Collection> {
    Arc::new(actions.into_iter().map(|a| (a.id.clone(), Arc::new(a))).collect())
}

/// A plausible action with id `index`: mostly comments and money requests,
/// the odd edited or attachment message, timestamps spread over a few years.
pub fn random_action<R: Rng + ?Sized>(rng: &mut R, index: u64) -> Action {
    let kind = match rng.gen_range(0..100) {
        0..=64 => ActionKind::Comment,
        65..=79 => ActionKind::MoneyRequest,
        80..=87 => ActionKind::ReportPreview,
        88..=93 => ActionKind::SystemWhisper,
        94..=96 => ActionKind::Closed,
        97..=98 => ActionKind::Created,
        _ => ActionKind::from_tag("CHRONOSOOOLIST"),
    };
    let created_at = Timestamp::new(
        rng.gen_range(1_600_000_000_000..1_700_000_000_000u64),
        rng.gen_range(0..4),
    );

    let words = rng.gen_range(1..=24);
    let text: Vec<&str> = (0..words)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect();
    let mut fragment = MessageFragment::text(text.join(" "));
    fragment.is_edited = rng.gen_bool(0.1);
    fragment.is_attachment = rng.gen_bool(0.05);

    Action::new(index, kind, created_at).with_message(vec![fragment])
}

/// `len` random actions with ids `1..=len`.
pub fn random_collection<R: Rng + ?Sized>(rng: &mut R, len: u64) -> Vec<Action> {
    (1..=len).map(|index| random_action(rng, index)).collect()
}

/// `len` comments whose timestamps strictly increase with their ids.
pub fn sequential_collection(len: u64) -> Vec<Action> {
    (1..=len)
        .map(|i| comment(i, 1_000 * i, &format!("message {i}")))
        .collect()
}
