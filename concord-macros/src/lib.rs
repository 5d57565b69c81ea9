//! Procedural macros for Concord.
//!
//! - `#[concord::main]` and `#[concord::test]` run an `async fn` on the
//!   process host, optionally choosing `flavor = "event_loop" | "thread_pool"`
//!   and `worker_threads = N`.
//! - `join!(a, b, ...)` awaits several futures concurrently and returns
//!   their outputs as a tuple.

mod utils;

use proc_macro::{TokenStream, TokenTree};
use utils::RuntimeArgs;

#[proc_macro]
pub fn join(input: TokenStream) -> TokenStream {
    let args = utils::split_args(input);
    let count = args.len();

    if count == 0 {
        return "()".parse().unwrap_or_default();
    }

    if count == 1 {
        let expr = utils::tokens_to_string(&args[0]);
        return format!("{{ ({expr}).await }}").parse().unwrap_or_default();
    }

    let mut output = String::from("{\n");

    for (i, expr_tokens) in args.iter().enumerate() {
        let expr = utils::tokens_to_string(expr_tokens);
        output.push_str(&format!(
            "let mut __f{i} = (::std::boxed::Box::pin({expr}), ::core::option::Option::None::<_>);\n"
        ));
    }

    output.push_str("::std::future::poll_fn(move |cx| {\n");
    output.push_str("    use ::std::future::Future as _;\n");

    for i in 0..count {
        output.push_str(&format!(
            "    if __f{i}.1.is_none() {{\n\
                    if let ::std::task::Poll::Ready(val) = __f{i}.0.as_mut().poll(cx) {{\n\
                        __f{i}.1 = ::core::option::Option::Some(val);\n\
                    }}\n\
                }}\n"
        ));
    }

    let all_done = (0..count)
        .map(|i| format!("__f{i}.1.is_some()"))
        .collect::<Vec<_>>()
        .join(" && ");

    let outputs = (0..count)
        .map(|i| format!("__f{i}.1.take().unwrap()"))
        .collect::<Vec<_>>()
        .join(", ");

    output.push_str(&format!(
        "    if {all_done} {{\n\
                ::std::task::Poll::Ready(({outputs},))\n\
            }} else {{\n\
                ::std::task::Poll::Pending\n\
            }}\n"
    ));
    output.push_str("}).await\n}\n");

    output
        .parse()
        .unwrap_or_else(|err| utils::compile_error(&format!("join macro error: {err}")))
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match RuntimeArgs::parse(attr) {
        Ok(args) => args,
        Err(err) => return utils::compile_error(&format!("concord::main: {err}")),
    };

    match utils::wrap_async_fn(item, &args.builder()) {
        Ok(tokens) => tokens.into_iter().collect(),
        Err(err) => utils::compile_error(&format!("concord::main: {err}")),
    }
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match RuntimeArgs::parse(attr) {
        Ok(args) => args,
        Err(err) => return utils::compile_error(&format!("concord::test: {err}")),
    };

    let tokens = match utils::wrap_async_fn(item, &args.builder()) {
        Ok(tokens) => tokens,
        Err(err) => return utils::compile_error(&format!("concord::test: {err}")),
    };

    let test_attr: TokenStream = "#[::core::prelude::v1::test]".parse().unwrap_or_default();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}
