use rand::Rng;
use serde::{Deserialize, Serialize};

/// Challenge kind, selected by configuration and stored with each session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Image,
    Quiz,
}

/// One quiz question: prompt, ordered options, index of the correct option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

impl QuizQuestion {
    pub fn is_valid(&self) -> bool {
        !self.options.is_empty() && self.correct_answer < self.options.len()
    }
}

/// Unambiguous alphabet: uppercase minus I/O/0/1-lookalikes, digits 2-9.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const CODE_LEN: usize = 5;

/// A freshly generated challenge, carrying its own expected answer.
#[derive(Clone, Debug)]
pub enum Challenge {
    Image { code: String, image_url: String },
    Quiz { question: QuizQuestion },
}

impl Challenge {
    /// Generate a challenge of the given kind. Quiz questions come from the
    /// custom pool when non-empty, the built-in pool otherwise.
    pub fn generate(kind: ChallengeKind, custom_questions: Option<&[QuizQuestion]>) -> Self {
        let mut rng = rand::thread_rng();
        match kind {
            ChallengeKind::Image => {
                let code = generate_code(&mut rng);
                let image_url = image_url(&mut rng, &code);
                Challenge::Image { code, image_url }
            }
            ChallengeKind::Quiz => Challenge::Quiz {
                question: pick_question(&mut rng, custom_questions),
            },
        }
    }

    pub fn kind(&self) -> ChallengeKind {
        match self {
            Challenge::Image { .. } => ChallengeKind::Image,
            Challenge::Quiz { .. } => ChallengeKind::Quiz,
        }
    }

    /// The string persisted as the session's expected answer: the literal
    /// code for images, the correct option's index for quizzes.
    pub fn expected_answer(&self) -> String {
        match self {
            Challenge::Image { code, .. } => code.clone(),
            Challenge::Quiz { question } => question.correct_answer.to_string(),
        }
    }
}

fn generate_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Render the code through an image placeholder service. Light random
/// background, dark random text for contrast; the exact rendering is
/// cosmetic, not a contract.
fn image_url(rng: &mut impl Rng, code: &str) -> String {
    let bg: u32 = rng.gen_range(0x333333..0xFFFFFF);
    let fg: u32 = rng.gen_range(0x000000..0x666666);
    format!("https://dummyimage.com/300x100/{bg:06x}/{fg:06x}.png&text={code}")
}

fn pick_question(rng: &mut impl Rng, custom: Option<&[QuizQuestion]>) -> QuizQuestion {
    match custom {
        Some(pool) if !pool.is_empty() => pool[rng.gen_range(0..pool.len())].clone(),
        _ => {
            let pool = default_questions();
            pool[rng.gen_range(0..pool.len())].clone()
        }
    }
}

/// Built-in quiz pool, used when no custom questions are configured.
pub fn default_questions() -> Vec<QuizQuestion> {
    fn q(question: &str, options: &[&str], correct_answer: usize) -> QuizQuestion {
        QuizQuestion {
            question: question.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer,
        }
    }

    vec![
        q("Pick the correct answer: 2 + 3 = ?", &["3", "5", "7", "8"], 1),
        q(
            "Which of these is an animal?",
            &["🌵 Cactus", "🐱 Cat", "🌸 Flower", "🌲 Tree"],
            1,
        ),
        q(
            "Which one is a fruit?",
            &["🍕 Pizza", "🍔 Burger", "🍎 Apple", "🍰 Cake"],
            2,
        ),
        q("Pick the correct answer: 5 × 2 = ?", &["8", "10", "12", "15"], 1),
        q(
            "Which of these is a vehicle?",
            &["🏠 House", "🚗 Car", "📱 Phone", "📚 Book"],
            1,
        ),
        q("Which number is the largest?", &["5", "15", "25", "35"], 3),
        q(
            "Which one is the color red?",
            &["🔵 Blue", "🔴 Red", "🟢 Green", "🟡 Yellow"],
            1,
        ),
    ]
}
