//! Construction of initializer calldata from name-keyed arguments
//!
//! Arguments are supplied as `name=value` pairs and bound against the
//! initializer's ABI parameters **by name**, in the ABI's declaration
//! order. Silently mis-ordered positional arguments across contract
//! versions are the defect class this module exists to prevent: any arity
//! or name mismatch fails loudly before a transaction is built.

use std::str::FromStr;

use ethers::{
    abi::{Function, Param, ParamType, Token},
    types::{Address, U256},
};

use crate::errors::ScriptError;

/// Parse raw `name=value` strings into (name, value) pairs
pub fn parse_named_args(raw: &[String]) -> Result<Vec<(String, String)>, ScriptError> {
    raw.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| {
                    ScriptError::ArgumentArityMismatch(format!(
                        "argument `{}` is not of the form name=value",
                        arg
                    ))
                })
        })
        .collect()
}

/// Bind the provided arguments against the initializer's parameters,
/// returning tokens in the ABI's declaration order
pub fn bind_init_args(
    initializer: &Function,
    provided: &[(String, String)],
) -> Result<Vec<Token>, ScriptError> {
    if provided.len() != initializer.inputs.len() {
        return Err(ScriptError::ArgumentArityMismatch(format!(
            "initializer takes {} arguments ({}), {} provided",
            initializer.inputs.len(),
            expected_order(initializer),
            provided.len(),
        )));
    }

    for (index, (name, _)) in provided.iter().enumerate() {
        if provided[..index].iter().any(|(other, _)| other == name) {
            return Err(ScriptError::ArgumentArityMismatch(format!(
                "argument `{}` supplied more than once",
                name
            )));
        }
    }

    initializer
        .inputs
        .iter()
        .map(|param| {
            let (_, value) = provided
                .iter()
                .find(|(name, _)| name == &param.name)
                .ok_or_else(|| {
                    ScriptError::ArgumentArityMismatch(format!(
                        "missing argument `{}`; initializer takes ({})",
                        param.name,
                        expected_order(initializer),
                    ))
                })?;
            token_for(param, value)
        })
        .collect()
}

/// ABI-encode the bound tokens as a call to the initializer
pub fn initializer_calldata(
    initializer: &Function,
    tokens: &[Token],
) -> Result<Vec<u8>, ScriptError> {
    initializer
        .encode_input(tokens)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
}

/// Render the initializer's parameter names in declaration order
fn expected_order(initializer: &Function) -> String {
    initializer
        .inputs
        .iter()
        .map(|param| param.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert one textual value to a token of the parameter's ABI type
fn token_for(param: &Param, value: &str) -> Result<Token, ScriptError> {
    match &param.kind {
        ParamType::Address => {
            let address = Address::from_str(value).map_err(|e| {
                ScriptError::InvalidAddress(format!("argument `{}`: {}: {}", param.name, value, e))
            })?;

            // The all-zero address is the documented "unset" sentinel for
            // the validator slot and an error everywhere else
            if address == Address::zero() && !is_validator_slot(&param.name) {
                return Err(ScriptError::InvalidAddress(format!(
                    "argument `{}` is the zero address",
                    param.name
                )));
            }

            Ok(Token::Address(address))
        }
        ParamType::String => Ok(Token::String(value.to_string())),
        ParamType::Uint(_) => U256::from_dec_str(value)
            .map(Token::Uint)
            .map_err(|e| {
                ScriptError::CalldataConstruction(format!(
                    "argument `{}`: {}: {}",
                    param.name, value, e
                ))
            }),
        ParamType::Bool => value.parse::<bool>().map(Token::Bool).map_err(|e| {
            ScriptError::CalldataConstruction(format!("argument `{}`: {}: {}", param.name, value, e))
        }),
        other => Err(ScriptError::CalldataConstruction(format!(
            "argument `{}` has unsupported ABI type {}",
            param.name, other
        ))),
    }
}

/// Whether a parameter is the validator slot, for which the zero-address
/// sentinel is permitted
fn is_validator_slot(name: &str) -> bool {
    name.to_lowercase().contains("validator")
}

#[cfg(test)]
#[allow(deprecated)] // `Function::constant` is deprecated but has no default
mod tests {
    use ethers::abi::StateMutability;

    use super::*;

    /// Build an ABI parameter of the given type
    fn param(name: &str, kind: ParamType) -> Param {
        Param {
            name: name.to_string(),
            kind,
            internal_type: None,
        }
    }

    /// The initializer signature of the role-gated plots contract
    fn initializer() -> Function {
        Function {
            name: "initialize".to_string(),
            inputs: vec![
                param("manager", ParamType::Address),
                param("pauser", ParamType::Address),
                param("upgrader", ParamType::Address),
                param("royaltyReceiver", ParamType::Address),
                param("initialValidator", ParamType::Address),
                param("name_", ParamType::String),
                param("symbol_", ParamType::String),
                param("lockDuration", ParamType::Uint(256)),
            ],
            outputs: vec![],
            constant: None,
            state_mutability: StateMutability::NonPayable,
        }
    }

    /// A full, valid argument set with the zero-address validator sentinel
    fn valid_args() -> Vec<String> {
        vec![
            "manager=0x00000000000000000000000000000000000000aa".to_string(),
            "pauser=0x00000000000000000000000000000000000000aa".to_string(),
            "upgrader=0x00000000000000000000000000000000000000aa".to_string(),
            "royaltyReceiver=0x00000000000000000000000000000000000000aa".to_string(),
            "initialValidator=0x0000000000000000000000000000000000000000".to_string(),
            "name_=Plots".to_string(),
            "symbol_=PLT".to_string(),
            "lockDuration=0".to_string(),
        ]
    }

    /// A full valid set binds in ABI order and encodes to calldata
    #[test]
    fn test_bind_and_encode_valid_args() {
        let init = initializer();
        let provided = parse_named_args(&valid_args()).unwrap();

        let tokens = bind_init_args(&init, &provided).unwrap();
        assert_eq!(tokens.len(), 8);
        assert_eq!(tokens[4], Token::Address(Address::zero()));
        assert_eq!(tokens[5], Token::String("Plots".to_string()));

        let calldata = initializer_calldata(&init, &tokens).unwrap();
        assert_eq!(&calldata[..4], init.short_signature().as_slice());
    }

    /// Binding is keyed by name: supplying the arguments in reverse order
    /// yields exactly the same token sequence
    #[test]
    fn test_binding_is_order_independent() {
        let init = initializer();
        let forward = parse_named_args(&valid_args()).unwrap();
        let mut reversed = forward.clone();
        reversed.reverse();

        let forward_tokens = bind_init_args(&init, &forward).unwrap();
        let reversed_tokens = bind_init_args(&init, &reversed).unwrap();
        assert_eq!(forward_tokens, reversed_tokens);
    }

    /// Swapping the values of two role arguments swaps the corresponding
    /// token positions, so the swap is visible in the encoded calldata
    #[test]
    fn test_role_swap_is_reflected_in_tokens() {
        let init = initializer();
        let pauser = "0x00000000000000000000000000000000000000bb";
        let upgrader = "0x00000000000000000000000000000000000000cc";

        let mut args = valid_args();
        args[1] = format!("pauser={}", pauser);
        args[2] = format!("upgrader={}", upgrader);
        let tokens = bind_init_args(&init, &parse_named_args(&args).unwrap()).unwrap();

        let mut swapped_args = valid_args();
        swapped_args[1] = format!("pauser={}", upgrader);
        swapped_args[2] = format!("upgrader={}", pauser);
        let swapped = bind_init_args(&init, &parse_named_args(&swapped_args).unwrap()).unwrap();

        assert_eq!(tokens[1], swapped[2]);
        assert_eq!(tokens[2], swapped[1]);
        assert_ne!(
            initializer_calldata(&init, &tokens).unwrap(),
            initializer_calldata(&init, &swapped).unwrap(),
        );
    }

    /// Seven arguments against an eight-parameter initializer fail with
    /// `ArgumentArityMismatch` before any encoding happens
    #[test]
    fn test_arity_mismatch() {
        let init = initializer();
        let mut args = valid_args();
        args.pop();

        let err = bind_init_args(&init, &parse_named_args(&args).unwrap()).unwrap_err();
        assert!(matches!(err, ScriptError::ArgumentArityMismatch(_)));
    }

    /// A supplied name the initializer does not declare fails loudly
    #[test]
    fn test_unknown_argument_name() {
        let init = initializer();
        let mut args = valid_args();
        args[0] = "manger=0x00000000000000000000000000000000000000aa".to_string();

        let err = bind_init_args(&init, &parse_named_args(&args).unwrap()).unwrap_err();
        assert!(matches!(err, ScriptError::ArgumentArityMismatch(_)));
    }

    /// A duplicated argument name fails rather than silently picking one
    #[test]
    fn test_duplicate_argument_name() {
        let init = initializer();
        let mut args = valid_args();
        args[1] = args[0].clone();

        let err = bind_init_args(&init, &parse_named_args(&args).unwrap()).unwrap_err();
        assert!(matches!(err, ScriptError::ArgumentArityMismatch(_)));
    }

    /// A malformed address fails with `InvalidAddress`
    #[test]
    fn test_invalid_address() {
        let init = initializer();
        let mut args = valid_args();
        args[0] = "manager=0x1234".to_string();

        let err = bind_init_args(&init, &parse_named_args(&args).unwrap()).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidAddress(_)));
    }

    /// The zero-address sentinel is only permitted for the validator slot
    #[test]
    fn test_zero_address_only_for_validator() {
        let init = initializer();
        let mut args = valid_args();
        args[0] = "manager=0x0000000000000000000000000000000000000000".to_string();

        let err = bind_init_args(&init, &parse_named_args(&args).unwrap()).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidAddress(_)));
    }

    /// A non-numeric lock duration fails during token conversion
    #[test]
    fn test_bad_uint() {
        let init = initializer();
        let mut args = valid_args();
        args[7] = "lockDuration=forever".to_string();

        let err = bind_init_args(&init, &parse_named_args(&args).unwrap()).unwrap_err();
        assert!(matches!(err, ScriptError::CalldataConstruction(_)));
    }
}
