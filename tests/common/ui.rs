use std::collections::VecDeque;

use anyhow::Result;
use ton_jetton_ico::controller::Ui;
use ton_jetton_ico::controller::prompt::find_option;

/// Operator UI which replays prepared answers and records the output.
#[derive(Default)]
pub struct ScriptedUi {
    answers: VecDeque<String>,
    pub output: Vec<String>,
}

impl ScriptedUi {
    pub fn new<I, T>(answers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            output: Vec::new(),
        }
    }

    pub fn printed(&self, text: &str) -> bool {
        self.output.iter().any(|line| line.contains(text))
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next_answer(&mut self, message: &str) -> Result<String> {
        self.output.push(format!("? {message}"));
        match self.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => anyhow::bail!("no scripted answer for `{message}`"),
        }
    }
}

impl Ui for ScriptedUi {
    fn write(&mut self, text: &str) {
        self.output.push(text.to_owned());
    }

    async fn input(&mut self, message: &str) -> Result<String> {
        self.next_answer(message)
    }

    async fn choose(&mut self, message: &str, options: &[&str]) -> Result<usize> {
        let answer = self.next_answer(message)?;
        match find_option(options, &answer) {
            Some(idx) => Ok(idx),
            None => anyhow::bail!("`{answer}` is not one of {options:?}"),
        }
    }
}
