use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: encore [OPTIONS]

Options:
  -l, --lavalink <host:port>   Connect to an already running Lavalink node
  -p, --lavalink-path <jar>    Path to the Lavalink jar to spawn
  -d, --dev                    Run in development mode
  -h, --help                   Print this help";

/// Launcher flags. Everything else comes from the environment.
#[derive(Debug, Default, PartialEq)]
pub struct LaunchArgs {
    pub lavalink: Option<String>,
    pub lavalink_path: Option<PathBuf>,
    pub dev: bool,
    pub help: bool,
}

impl LaunchArgs {
    pub fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-l" | "--lavalink" => {
                    let endpoint = args
                        .next()
                        .ok_or_else(|| format!("{arg} requires a <host:port> value"))?;
                    if !endpoint.contains(':') {
                        return Err(format!("invalid endpoint {endpoint:?}, expected <host:port>"));
                    }
                    parsed.lavalink = Some(endpoint);
                }
                "-p" | "--lavalink-path" => {
                    let path = args
                        .next()
                        .ok_or_else(|| format!("{arg} requires a path value"))?;
                    parsed.lavalink_path = Some(PathBuf::from(path));
                }
                "-d" | "--dev" => parsed.dev = true,
                "-h" | "--help" => parsed.help = true,
                other => return Err(format!("unknown flag {other:?}")),
            }
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<LaunchArgs, String> {
        LaunchArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_endpoint_and_dev() {
        let args = parse(&["--lavalink", "127.0.0.1:2333", "-d"]).unwrap();
        assert_eq!(args.lavalink.as_deref(), Some("127.0.0.1:2333"));
        assert!(args.dev);
        assert!(args.lavalink_path.is_none());
    }

    #[test]
    fn rejects_endpoint_without_port() {
        assert!(parse(&["-l", "localhost"]).is_err());
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(parse(&["--frobnicate"]).is_err());
    }

    #[test]
    fn empty_args_are_defaults() {
        assert_eq!(parse(&[]).unwrap(), LaunchArgs::default());
    }
}
