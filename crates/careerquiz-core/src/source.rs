//! Built-in question sources.
//!
//! [`StaticSource`] hands out the same bank every time. [`ShuffledSource`]
//! derives a fresh ordering (and optionally a subset) per attempt from a
//! base bank, using a distinct seed for each attempt.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::model::{Question, QuestionBank};
use crate::traits::QuestionSource;

/// Always returns the same bank.
pub struct StaticSource {
    bank: QuestionBank,
}

impl StaticSource {
    pub fn new(bank: QuestionBank) -> Self {
        Self { bank }
    }
}

#[async_trait]
impl QuestionSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn next_bank(&self) -> Result<QuestionBank> {
        Ok(self.bank.clone())
    }
}

/// Reshuffles a base bank for every attempt.
pub struct ShuffledSource {
    base: QuestionBank,
    shuffle_options: bool,
    sample_size: Option<usize>,
    next_seed: AtomicU64,
}

impl ShuffledSource {
    /// Shuffle question order, seeding the first attempt with `seed`.
    pub fn new(base: QuestionBank, seed: u64) -> Self {
        Self {
            base,
            shuffle_options: false,
            sample_size: None,
            next_seed: AtomicU64::new(seed),
        }
    }

    /// Also shuffle the options within each question.
    pub fn shuffle_options(mut self, enabled: bool) -> Self {
        self.shuffle_options = enabled;
        self
    }

    /// Draw at most `n` questions per attempt.
    pub fn sample(mut self, n: usize) -> Self {
        self.sample_size = Some(n.max(1));
        self
    }

    fn build(&self, seed: u64) -> Result<QuestionBank> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut questions: Vec<Question> = self.base.questions().to_vec();
        questions.shuffle(&mut rng);

        if let Some(n) = self.sample_size {
            questions.truncate(n);
        }

        if self.shuffle_options {
            for q in &mut questions {
                shuffle_question_options(q, &mut rng);
            }
        }

        Ok(self.base.with_questions(questions)?)
    }
}

fn shuffle_question_options(question: &mut Question, rng: &mut StdRng) {
    let mut order: Vec<usize> = (0..question.options.len()).collect();
    order.shuffle(rng);

    let options = order
        .iter()
        .map(|&i| question.options[i].clone())
        .collect();
    if let Some(pos) = order.iter().position(|&i| i == question.correct_index) {
        question.correct_index = pos;
    }
    question.options = options;
}

#[async_trait]
impl QuestionSource for ShuffledSource {
    fn name(&self) -> &str {
        "shuffled"
    }

    async fn next_bank(&self) -> Result<QuestionBank> {
        let seed = self.next_seed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(bank = %self.base.id, seed, "shuffling bank");
        self.build(seed)
    }
}
