//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// The body is wrapped in `async move`, so everything it touches must be
/// owned (clone adapters out of the environment first).
///
/// # Example
///
/// ```rust,ignore
/// use carebridge_core::async_effect;
///
/// let identity = env.identity.clone();
/// async_effect! {
///     match identity.sign_out().await {
///         Ok(()) => Some(AuthAction::LoggedOut),
///         Err(error) => Some(AuthAction::LogoutFailed { error }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        AsyncResult { value: i32 },
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::AsyncResult { value: 42 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[test]
    fn test_async_effect_resolves_to_body() {
        let effect = async_effect! {
            Some(TestAction::AsyncResult { value: 7 })
        };

        let Effect::Future(fut) = effect else {
            unreachable!("async_effect! always builds Effect::Future");
        };
        let action = tokio_test::block_on(fut);
        assert_eq!(action, Some(TestAction::AsyncResult { value: 7 }));
    }
}
