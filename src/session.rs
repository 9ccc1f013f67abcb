//! The interactive loop: prompt for a term and a bound, run the batch, report.

use crate::{
    app::{AppError, BatchReport, HarvestCommand, Harvester},
    console::Console,
};
use std::{error::Error, io};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::warn;

/// Largest result bound accepted at the prompt.
pub const MAX_RESULTS_LIMIT: usize = 100;

const QUERY_PROMPT: &str = "\nEnter the search query (or 'exit' to quit): ";
const BOUND_PROMPT: &str = "Enter the maximum number of images to download[0-100]: ";

/// What the user asked for at the query prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    /// Blank input; prompt again.
    Empty,
    Search(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            Command::Exit
        } else if line.is_empty() {
            Command::Empty
        } else {
            Command::Search(line.to_string())
        }
    }
}

/// Parses a result bound, accepting integers from 0 to [`MAX_RESULTS_LIMIT`].
pub fn parse_max_results(raw: &str) -> Option<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|bound| *bound <= MAX_RESULTS_LIMIT)
}

/// Totals over a whole session.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Searches submitted, successful or not.
    pub queries: usize,
    pub stored: usize,
    pub skipped: usize,
}

/// Runs prompts until `exit` or end of input.
///
/// Failed searches are printed and the loop goes on, unless the failure is
/// fatal (rejected credentials), which ends the session with that error.
pub async fn run<R, W>(
    console: &mut Console<R, W>,
    harvester: &Harvester,
) -> Result<SessionSummary, AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = SessionSummary::default();

    loop {
        let Some(line) = console.ask(QUERY_PROMPT).await? else {
            break;
        };

        let query_term = match Command::parse(&line) {
            Command::Exit => break,
            Command::Empty => continue,
            Command::Search(term) => term,
        };

        let Some(raw) = console.ask(BOUND_PROMPT).await? else {
            break;
        };
        let Some(max_results) = parse_max_results(&raw) else {
            console.say("Wrong value!").await?;
            continue;
        };

        console.say("please wait a few seconds...").await?;
        summary.queries += 1;

        match HarvestCommand::new(&query_term)
            .with_max_results(max_results)
            .execute(harvester)
            .await
        {
            Ok(report) => {
                summary.stored += report.stored.len();
                summary.skipped += report.failures.len();
                print_report(console, &report).await?;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(query = %query_term, error = %e, "search failed");
                console
                    .say(format!("Search failed: {}", error_chain(&e)))
                    .await?;
            }
        }
    }

    Ok(summary)
}

/// Writes the outcome of a batch for the user.
pub async fn print_report<R, W>(console: &mut Console<R, W>, report: &BatchReport) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if report.found == 0 {
        return console.say("No result found!").await;
    }

    console
        .say(format!("Found {} results", report.found))
        .await?;

    for failure in &report.failures {
        console
            .say(format!(
                "[{}] skipped {}: {}",
                failure.position,
                failure.source_url,
                error_chain(&failure.reason)
            ))
            .await?;
    }

    console.say("-".repeat(40)).await?;
    console
        .say(format!(
            "Stored {} of {} images in {:.2}s",
            report.stored.len(),
            report.found,
            report.elapsed.as_secs_f64()
        ))
        .await
}

/// Renders an error followed by each of its sources, `": "` separated.
pub fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.contains(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::{Command, parse_max_results};

    #[test]
    fn test_parse_command() {
        assert_eq!(Command::Exit, Command::parse("exit"));
        assert_eq!(Command::Exit, Command::parse("  EXIT \n"));
        assert_eq!(Command::Empty, Command::parse("   "));
        assert_eq!(
            Command::Search("red apple".to_string()),
            Command::parse(" red apple ")
        );
        assert_eq!(
            Command::Search("exit strategy".to_string()),
            Command::parse("exit strategy")
        );
    }

    #[test]
    fn test_parse_max_results() {
        assert_eq!(Some(0), parse_max_results("0"));
        assert_eq!(Some(100), parse_max_results(" 100 "));
        assert_eq!(None, parse_max_results("101"));
        assert_eq!(None, parse_max_results("-1"));
        assert_eq!(None, parse_max_results("ten"));
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod interactive_tests {
    use super::{SessionSummary, run};
    use crate::{
        app::tests::{get_harvester, mount_red_apple},
        console::Console,
    };
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn run_with_input(server: &MockServer, input: &[u8]) -> (Result<SessionSummary, crate::app::AppError>, String) {
        let harvester = get_harvester(server).await;
        let mut console = Console::new(input, Vec::new());

        let result = run(&mut console, &harvester).await;

        (result, String::from_utf8(console.into_output()).unwrap())
    }

    #[tokio::test]
    async fn test_exit_makes_no_api_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (result, output) = run_with_input(&server, b"exit\nred apple\n5\n").await;

        assert_eq!(SessionSummary::default(), result.unwrap());
        assert!(output.contains("Enter the search query"));
        assert!(!output.contains("maximum number"));
    }

    #[tokio::test]
    async fn test_query_then_exit() {
        let server = MockServer::start().await;
        mount_red_apple(&server).await;

        let (result, output) = run_with_input(&server, b"red apple\n2\nExit\n").await;

        assert_eq!(
            SessionSummary {
                queries: 1,
                stored: 1,
                skipped: 1,
            },
            result.unwrap()
        );
        assert!(output.contains("Found 2 results"));
        assert!(output.contains("[2] skipped"));
        assert!(output.contains("Stored 1 of 2 images"));
    }

    #[tokio::test]
    async fn test_wrong_bound_is_rejected_before_searching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (result, output) = run_with_input(&server, b"red apple\n500\n").await;

        assert_eq!(0, result.unwrap().queries);
        assert!(output.contains("Wrong value!"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "Google hasn't returned any results for this query."
            })))
            .mount(&server)
            .await;

        let (result, output) = run_with_input(&server, b"qwxzv\n5\nexit\n").await;

        assert_eq!(1, result.unwrap().queries);
        assert!(output.contains("No result found!"));
    }

    #[tokio::test]
    async fn test_service_error_continues_the_loop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(2)
            .mount(&server)
            .await;

        let (result, output) = run_with_input(&server, b"first\n3\nsecond\n3\n").await;

        assert_eq!(2, result.unwrap().queries);
        assert_eq!(2, output.matches("Search failed").count());
    }

    #[tokio::test]
    async fn test_auth_error_ends_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid API key." })))
            .expect(1)
            .mount(&server)
            .await;

        let (result, _) = run_with_input(&server, b"red apple\n3\nred apple\n3\n").await;

        assert!(result.unwrap_err().is_fatal());
    }
}
