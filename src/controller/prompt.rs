use std::future::Future;

use anyhow::{Context, Result};
use num_bigint::BigUint;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tycho_types::models::{StdAddr, StdAddrFormat};
use tycho_types::num::Tokens;

use crate::contract::ONE_TON;

/// Operator interaction surface.
pub trait Ui: Send {
    fn write(&mut self, text: &str);

    /// Asks for a single line of input.
    fn input(&mut self, message: &str) -> impl Future<Output = Result<String>> + Send;

    /// Asks to pick one of `options`, returns its index.
    fn choose(
        &mut self,
        message: &str,
        options: &[&str],
    ) -> impl Future<Output = Result<usize>> + Send;
}

/// Interactive terminal UI.
pub struct ConsoleUi {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        match self.lines.next_line().await.context("failed to read stdin")? {
            Some(line) => Ok(line.trim().to_owned()),
            None => anyhow::bail!("stdin closed"),
        }
    }
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::print_stdout)]
impl Ui for ConsoleUi {
    fn write(&mut self, text: &str) {
        println!("{text}");
    }

    async fn input(&mut self, message: &str) -> Result<String> {
        println!("? {message}");
        self.read_line().await
    }

    async fn choose(&mut self, message: &str, options: &[&str]) -> Result<usize> {
        loop {
            println!("? {message}");
            for (i, option) in options.iter().enumerate() {
                println!("  {}) {option}", i + 1);
            }

            let line = self.read_line().await?;
            if let Some(idx) = find_option(options, &line) {
                return Ok(idx);
            }
            println!("Unknown option: {line}");
        }
    }
}

/// Matches either a 1-based index or an option name.
pub fn find_option(options: &[&str], input: &str) -> Option<usize> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        return (1..=options.len()).contains(&n).then(|| n - 1);
    }
    options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(input))
}

pub async fn prompt_bool<U: Ui>(ui: &mut U, message: &str, choices: [&str; 2]) -> Result<bool> {
    loop {
        let answer = ui.input(message).await?;
        if answer.eq_ignore_ascii_case(choices[0]) {
            return Ok(true);
        } else if answer.eq_ignore_ascii_case(choices[1]) {
            return Ok(false);
        }
        ui.write(&format!("Please answer `{}` or `{}`", choices[0], choices[1]));
    }
}

pub async fn prompt_amount<U: Ui>(ui: &mut U, message: &str) -> Result<Tokens> {
    loop {
        let answer = ui.input(message).await?;
        match parse_ton_amount(&answer) {
            Ok(amount) => return Ok(amount),
            Err(e) => ui.write(&format!("{answer} is not a valid amount: {e}")),
        }
    }
}

pub async fn prompt_address<U: Ui>(
    ui: &mut U,
    message: &str,
    fallback: Option<&StdAddr>,
) -> Result<StdAddr> {
    let message = match fallback {
        Some(fallback) => format!("{message} (default: {fallback})"),
        None => message.to_owned(),
    };

    loop {
        let answer = ui.input(&message).await?;
        if answer.is_empty() {
            if let Some(fallback) = fallback {
                return Ok(fallback.clone());
            }
        }

        match StdAddr::from_str_ext(&answer, StdAddrFormat::any()) {
            Ok((addr, _)) => return Ok(addr),
            Err(e) => ui.write(&format!("{answer} is not a valid address: {e}")),
        }
    }
}

pub async fn prompt_url<U: Ui>(ui: &mut U, message: &str) -> Result<String> {
    loop {
        let answer = ui.input(message).await?;
        match reqwest::Url::parse(&answer) {
            Ok(_) => return Ok(answer),
            Err(e) => ui.write(&format!("{answer} is not a valid url: {e}")),
        }
    }
}

/// Parses a decimal TON amount into nanotons.
pub fn parse_ton_amount(value: &str) -> Result<Tokens> {
    const DECIMALS: usize = 9;

    let value = value.trim();
    let (int, frac) = value.split_once('.').unwrap_or((value, ""));
    anyhow::ensure!(!int.is_empty() || !frac.is_empty(), "empty amount");
    anyhow::ensure!(frac.len() <= DECIMALS, "too many decimal places");

    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    anyhow::ensure!(digits(int) && digits(frac), "unexpected characters");

    let int = if int.is_empty() { 0 } else { int.parse::<u128>()? };
    let frac = if frac.is_empty() {
        0
    } else {
        frac.parse::<u128>()? * 10u128.pow((DECIMALS - frac.len()) as u32)
    };

    int.checked_mul(ONE_TON)
        .and_then(|int| int.checked_add(frac))
        .map(Tokens::new)
        .context("amount is too big")
}

/// Formats nanotons as a decimal TON amount.
pub fn format_ton(value: &BigUint) -> String {
    let one = BigUint::from(ONE_TON);
    let int = value / &one;
    let frac = value % &one;
    if frac == BigUint::ZERO {
        return int.to_string();
    }

    let frac = frac.to_string();
    let frac = format!("{frac:0>9}");
    format!("{int}.{}", frac.trim_end_matches('0'))
}
