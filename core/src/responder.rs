/// Pluggable peer response generation
///
/// The demo server has no real second human behind a pairing, so the
/// session can be given a responder that plays the other side: a greeting
/// shortly after pairing and canned replies to some outbound messages.
/// The core contract does not depend on this; it is a collaborator seam.
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

const GREETINGS: &[&str] = &[
    "Hi there! How are you doing today?",
    "Hello! Nice to meet you!",
    "Hey! What's up?",
    "Namaste! How's your day going?",
    "Hi! Looking forward to chatting with you!",
];

const RESPONSES: &[&str] = &[
    "That's interesting! Tell me more.",
    "I see what you mean.",
    "Hmm, I haven't thought about it that way.",
    "Really? That's cool!",
    "Nice! What else is going on?",
    "I'm curious to know more about that.",
    "That sounds fun!",
    "Ah, I understand now.",
    "Great point!",
    "I agree with you on that.",
];

const ADJECTIVES: &[&str] = &[
    "Happy", "Silent", "Clever", "Brave", "Calm", "Eager", "Gentle", "Humble", "Jolly", "Kind",
    "Lucky", "Mighty", "Noble", "Polite", "Quiet", "Wise",
];

const NOUNS: &[&str] = &[
    "Tiger", "Lotus", "Mountain", "River", "Eagle", "Peacock", "Elephant", "Mango", "Banyan",
    "Dolphin", "Falcon", "Lion", "Cheetah", "Oak", "Sparrow", "Jasmine",
];

/// A reply the peer will type out after `delay`
#[derive(Debug, Clone)]
pub struct ResponderReply {
    pub text: String,
    pub delay: Duration,
}

/// Generates what the paired peer says, if anything
pub trait PeerResponder: Send + Sync {
    /// Fired once right after pairing
    fn greeting(&self) -> Option<ResponderReply>;

    /// Fired for each outbound message from the local user
    fn reply_to(&self, text: &str) -> Option<ResponderReply>;
}

/// Canned responder with randomized replies and delays
pub struct CannedResponder {
    /// Chance of replying to an outbound message, 0.0..=1.0
    reply_chance: f64,
    min_delay: Duration,
    max_delay: Duration,
}

impl CannedResponder {
    pub fn new() -> Self {
        Self {
            reply_chance: 0.7,
            min_delay: Duration::from_millis(1500),
            max_delay: Duration::from_millis(3000),
        }
    }

    /// Deterministic-friendly constructor for tests
    pub fn with_params(reply_chance: f64, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            reply_chance,
            min_delay,
            max_delay,
        }
    }

    fn random_delay(&self) -> Duration {
        let mut rng = rand::thread_rng();
        let span = self.max_delay.saturating_sub(self.min_delay);
        self.min_delay + span.mul_f64(rng.gen::<f64>())
    }
}

impl Default for CannedResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerResponder for CannedResponder {
    fn greeting(&self) -> Option<ResponderReply> {
        let mut rng = rand::thread_rng();
        GREETINGS.choose(&mut rng).map(|text| ResponderReply {
            text: text.to_string(),
            delay: self.random_delay(),
        })
    }

    fn reply_to(&self, _text: &str) -> Option<ResponderReply> {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() >= self.reply_chance {
            return None;
        }
        RESPONSES.choose(&mut rng).map(|text| ResponderReply {
            text: text.to_string(),
            delay: self.random_delay(),
        })
    }
}

/// Random adjective+noun display name for an anonymous peer
pub fn random_display_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Quiet");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Sparrow");
    format!("{}{}", adjective, noun)
}
