//! Runtime for the Mellifera language: the value model with copy-on-write
//! containers, the comb encoder, environments, and the tree-walking
//! evaluator.

pub mod comb;
pub mod context;
pub mod dump;
pub mod env;
pub mod error;
pub mod eval;
pub mod ordered;
pub mod value;

pub use comb::{CombEncoder, CombError};
pub use context::Context;
pub use env::{EnvRef, Environment};
pub use error::{Error, Flow, TraceFrame};
pub use eval::{call, eval_program};
pub use value::{Builtin, BuiltinFn, Map, Record, Reference, Set, TypeValue, Value, Vector};

use mellifera_syntax::{ParseError, SourceLocation};

/// Parse and evaluate source text against an environment. The environment
/// defaults to a fresh child of the context's base environment.
pub fn eval_source(
    ctx: &Context,
    source: &str,
    location: Option<SourceLocation>,
    env: Option<&EnvRef>,
) -> Result<Value, SourceError> {
    let program = mellifera_syntax::parse(source, location)?;
    let child;
    let env = match env {
        Some(env) => env,
        None => {
            child = Environment::with_outer(ctx.base_environment().clone());
            &child
        }
    };
    Ok(eval_program(ctx, &program, env)?)
}

/// Either phase of failure when running source end to end.
#[derive(Debug)]
pub enum SourceError {
    Parse(ParseError),
    Runtime(Error),
}

impl From<ParseError> for SourceError {
    fn from(error: ParseError) -> Self {
        SourceError::Parse(error)
    }
}

impl From<Error> for SourceError {
    fn from(error: Error) -> Self {
        SourceError::Runtime(error)
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Parse(error) => write!(f, "{error}"),
            SourceError::Runtime(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for SourceError {}
