//! Line-oriented prompts over any async reader/writer pair.
//!
//! The binary wires this to stdin/stdout; tests feed a byte slice and capture
//! the output in a `Vec<u8>`.

use std::io;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};

/// Prompt/answer I/O for the interactive surface.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<BufReader<Stdin>, Stdout> {
    /// A console reading from standard input and writing to standard output.
    pub fn stdio() -> Self {
        Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Console { input, output }
    }

    /// Writes `prompt` without a newline and reads one line of input.
    ///
    /// The trailing line break is stripped. Returns `None` once the input is
    /// exhausted.
    pub async fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.output.write_all(prompt.as_bytes()).await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Returns `current` when present, otherwise asks for it.
    pub async fn value_or_ask(
        &mut self,
        current: Option<String>,
        prompt: &str,
    ) -> io::Result<Option<String>> {
        match current {
            Some(value) => Ok(Some(value)),
            None => self.ask(prompt).await,
        }
    }

    /// Writes one line of output.
    pub async fn say(&mut self, line: impl AsRef<str>) -> io::Result<()> {
        self.output.write_all(line.as_ref().as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    /// Consumes the console and hands back its writer.
    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::Console;

    #[tokio::test]
    async fn test_ask_strips_line_breaks_and_detects_eof() {
        let mut console = Console::new(&b"red apple\r\nexit"[..], Vec::new());

        assert_eq!(
            Some("red apple".to_string()),
            console.ask("query: ").await.unwrap()
        );
        assert_eq!(Some("exit".to_string()), console.ask("query: ").await.unwrap());
        assert_eq!(None, console.ask("query: ").await.unwrap());

        assert_eq!(
            "query: query: query: ",
            String::from_utf8(console.into_output()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_value_or_ask_skips_prompt_when_value_is_known() {
        let mut console = Console::new(&b""[..], Vec::new());

        let value = console
            .value_or_ask(Some("localhost".to_string()), "host: ")
            .await
            .unwrap();

        assert_eq!(Some("localhost".to_string()), value);
        assert!(console.into_output().is_empty());
    }
}
