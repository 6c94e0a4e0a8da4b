//! Options Lookup Module
//!
//! Resolves the expiration options to store with a method's result, by
//! declaring type and optionally by argument values.

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use crate::cache::CacheEntryOptions;
use crate::error::{CacheError, Result};
use crate::interception::{Invocation, KeyArg, MethodDescriptor, ToKeyArg};

// == Argument Pattern ==
/// Expected value of one argument position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgPattern {
    /// Matches any value, including absent ones
    Any,
    /// Matches only this value
    Exact(KeyArg),
}

impl ArgPattern {
    pub fn exact<T: ToKeyArg + ?Sized>(value: &T) -> Self {
        ArgPattern::Exact(value.to_key_arg())
    }

    fn matches(&self, argument: &KeyArg) -> bool {
        match self {
            ArgPattern::Any => true,
            ArgPattern::Exact(expected) => expected == argument,
        }
    }
}

// == Method Invocation Matcher ==
/// Binds a method plus argument patterns to the options for matching calls.
#[derive(Debug, Clone)]
pub struct MethodInvocationMatcher {
    method: MethodDescriptor,
    arguments: Vec<ArgPattern>,
    options: CacheEntryOptions,
}

impl MethodInvocationMatcher {
    /// Fails if the pattern count differs from the method's parameter count.
    pub fn new(
        method: MethodDescriptor,
        arguments: Vec<ArgPattern>,
        options: CacheEntryOptions,
    ) -> Result<Self> {
        if arguments.len() != method.parameters.len() {
            return Err(CacheError::Configuration(format!(
                "{} takes {} arguments but {} patterns were given",
                method,
                method.parameters.len(),
                arguments.len()
            )));
        }
        Ok(Self {
            method,
            arguments,
            options,
        })
    }

    pub fn matches(&self, invocation: &Invocation<'_>) -> bool {
        self.method.same_method(invocation.method)
            && self.arguments.len() == invocation.arguments.len()
            && self
                .arguments
                .iter()
                .zip(&invocation.arguments)
                .all(|(pattern, argument)| pattern.matches(argument))
    }

    /// Number of positions pinned to an exact value.
    fn specificity(&self) -> usize {
        self.arguments
            .iter()
            .filter(|pattern| matches!(pattern, ArgPattern::Exact(_)))
            .count()
    }

    pub fn options(&self) -> &CacheEntryOptions {
        &self.options
    }
}

// == Method Cache Options Lookup ==
/// Configured once at startup, then read on every cache write.
#[derive(Debug, Clone, Default)]
pub struct MethodCacheOptionsLookup {
    defaults_by_type: HashMap<&'static str, CacheEntryOptions>,
    matchers_by_type: HashMap<&'static str, Vec<MethodInvocationMatcher>>,
}

impl MethodCacheOptionsLookup {
    pub fn new() -> Self {
        Self::default()
    }

    // == Type Defaults ==
    /// Relative expiration for every method of `declaring_type`.
    pub fn add_relative_expiration(
        self,
        declaring_type: &'static str,
        relative: Duration,
    ) -> Result<Self> {
        self.add_options(declaring_type, CacheEntryOptions::relative(relative))
    }

    /// Options for every method of `declaring_type`.
    ///
    /// Each type may be given a default only once.
    pub fn add_options(
        mut self,
        declaring_type: &'static str,
        options: CacheEntryOptions,
    ) -> Result<Self> {
        reject_sliding(&options)?;
        if self.defaults_by_type.contains_key(declaring_type) {
            return Err(CacheError::Configuration(format!(
                "Cache entry options for {} are already configured",
                declaring_type
            )));
        }
        self.defaults_by_type.insert(declaring_type, options);
        Ok(self)
    }

    // == Method Matchers ==
    /// Relative expiration for calls to `method` whose arguments match
    /// `arguments`, one pattern per parameter.
    pub fn add_relative_expiration_for(
        self,
        method: &MethodDescriptor,
        arguments: Vec<ArgPattern>,
        relative: Duration,
    ) -> Result<Self> {
        self.add_options_for(method, arguments, CacheEntryOptions::relative(relative))
    }

    pub fn add_options_for(
        mut self,
        method: &MethodDescriptor,
        arguments: Vec<ArgPattern>,
        options: CacheEntryOptions,
    ) -> Result<Self> {
        reject_sliding(&options)?;
        let matcher = MethodInvocationMatcher::new(method.clone(), arguments, options)?;
        self.matchers_by_type
            .entry(method.declaring_type)
            .or_default()
            .push(matcher);
        Ok(self)
    }

    // == Cache Entry Options ==
    /// Options for `invocation`.
    ///
    /// The matcher with the most exact positions wins, the earliest
    /// registered on a tie. Without a matching matcher the type default
    /// applies, and without that, empty options.
    pub fn cache_entry_options(&self, invocation: &Invocation<'_>) -> CacheEntryOptions {
        let declaring_type = invocation.method.declaring_type;

        let best = self
            .matchers_by_type
            .get(declaring_type)
            .into_iter()
            .flatten()
            .filter(|matcher| matcher.matches(invocation))
            .fold(None::<&MethodInvocationMatcher>, |best, candidate| match best {
                Some(current) if current.specificity() >= candidate.specificity() => Some(current),
                _ => Some(candidate),
            });

        if let Some(matcher) = best {
            return matcher.options().clone();
        }

        if let Some(options) = self.defaults_by_type.get(declaring_type) {
            return options.clone();
        }

        warn!(
            method = %invocation.method,
            "Missing cache entry options configuration, the default policy applies"
        );
        CacheEntryOptions::new()
    }
}

fn reject_sliding(options: &CacheEntryOptions) -> Result<()> {
    if options.sliding_expiration.is_some() {
        return Err(CacheError::Configuration(
            "Sliding expiration is not supported for method caching".to_string(),
        ));
    }
    Ok(())
}
