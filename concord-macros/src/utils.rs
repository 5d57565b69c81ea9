use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`. Only top-level commas
/// separate arguments; commas inside groups stay inside their group token.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens into a Rust source string.
///
/// A space is inserted between consecutive identifiers to avoid accidental
/// token merging (e.g. `foo bar` vs `foobar`).
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    let mut out = String::new();
    let mut prev_was_ident = false;

    for t in tokens {
        let is_ident = matches!(t, TokenTree::Ident(_));

        if prev_was_ident && is_ident {
            out.push(' ');
        }

        out.push_str(&t.to_string());
        prev_was_ident = is_ident;
    }

    out
}

/// Renders a `compile_error!` invocation carrying `message`.
pub(crate) fn compile_error(message: &str) -> TokenStream {
    format!("compile_error!({message:?});")
        .parse()
        .unwrap_or_default()
}

/// Options accepted by `#[concord::main]` and `#[concord::test]`.
#[derive(Default)]
pub(crate) struct RuntimeArgs {
    flavor: Option<&'static str>,
    worker_threads: Option<usize>,
}

impl RuntimeArgs {
    /// Parses `flavor = "..."` and `worker_threads = N`, in any order.
    pub(crate) fn parse(attr: TokenStream) -> Result<Self, String> {
        let mut args = RuntimeArgs::default();

        for arg in split_args(attr) {
            let source = tokens_to_string(&arg);
            let Some((key, value)) = source.split_once('=') else {
                return Err(format!("expected `key = value`, found `{source}`"));
            };

            let value = value.trim();

            match key.trim() {
                "flavor" => {
                    args.flavor = Some(match value.trim_matches('"') {
                        "event_loop" => "EventLoop",
                        "thread_pool" => "ThreadPool",
                        other => {
                            return Err(format!(
                                "unknown flavor `{other}`, expected \"event_loop\" or \"thread_pool\""
                            ));
                        }
                    });
                }
                "worker_threads" => match value.parse::<usize>() {
                    Ok(n) if n > 0 => args.worker_threads = Some(n),
                    _ => return Err(format!("worker_threads must be a positive integer, found `{value}`")),
                },
                other => return Err(format!("unknown attribute `{other}`")),
            }
        }

        Ok(args)
    }

    /// Source of the `RuntimeBuilder` expression these options describe.
    pub(crate) fn builder(&self) -> String {
        let mut builder = String::from("::concord::RuntimeBuilder::new()");

        if let Some(flavor) = self.flavor {
            builder.push_str(&format!(".flavor(::concord::Flavor::{flavor})"));
        }

        if let Some(n) = self.worker_threads {
            builder.push_str(&format!(".worker_threads({n})"));
        }

        builder.push_str(".build()");
        builder
    }
}

/// Rewrites an `async fn` so that its body runs inside `block_on`.
///
/// The `async` keyword is removed and the body becomes
/// `builder.block_on(async move { body })`.
pub(crate) fn wrap_async_fn(item: TokenStream, builder: &str) -> Result<Vec<TokenTree>, String> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    else {
        return Err("the `async` keyword is missing from the function declaration".to_string());
    };
    tokens.remove(async_pos);

    let Some(pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return Err("expected a function body".to_string());
    };

    let TokenTree::Group(body) = &tokens[pos] else {
        return Err("expected a function body".to_string());
    };

    let new_body = format!(
        "{{
            let runtime = {builder};
            runtime.block_on(async move {{ {} }})
        }}",
        body.stream()
    );

    let stream: TokenStream = new_body.parse().map_err(|err| format!("{err}"))?;
    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    Ok(tokens)
}
