// Structured reader for `System.config({...})` files
//
// The file is parsed as JavaScript and the argument of each top-level config
// call is read as data: nothing in the file is ever executed, and calls inside
// comments or strings are never seen.

use crate::bundler::error::ConfigError;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, CallExpression, Expression, ObjectExpression,
    ObjectPropertyKind, PropertyKey, PropertyKind, Statement, UnaryOperator,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use serde_json::{Map, Number, Value};

/// Objects whose `config` method configures the loader
const CONFIG_RECEIVERS: &[&str] = &["System", "SystemJS"];

/// Parse every config call in `source` and accumulate their arguments
///
/// Calls are applied in order. Object values are merged key by key into what
/// earlier calls set; any other value replaces the previous one.
pub fn parse_config_source(source: &str) -> Result<Map<String, Value>, ConfigError> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::default()).parse();
    if !parsed.errors.is_empty() {
        let errors: Vec<String> = parsed.errors.iter().map(|e| e.to_string()).collect();
        return Err(ConfigError::Syntax(errors.join("\n")));
    }

    let mut applied = Map::new();
    let mut found = false;

    for statement in &parsed.program.body {
        let Statement::ExpressionStatement(statement) = statement else {
            continue;
        };
        let Some(call) = config_call(&statement.expression) else {
            continue;
        };
        found = true;

        let Some(Argument::ObjectExpression(argument)) = call.arguments.first() else {
            return Err(ConfigError::Invalid(
                "System.config argument must be an object".to_string(),
            ));
        };
        apply_config(&mut applied, object_value(argument)?);
    }

    if !found {
        return Err(ConfigError::MissingConfigCall);
    }

    Ok(applied)
}

/// Apply one config call's entries onto the accumulated state
pub fn apply_config(applied: &mut Map<String, Value>, entries: Map<String, Value>) {
    for (key, value) in entries {
        match value {
            Value::Object(nested) => {
                let slot = applied
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(target) = slot {
                    for (sub_key, sub_value) in nested {
                        target.insert(sub_key, sub_value);
                    }
                }
            }
            // arrays replace the previous value instead of merging by index
            other => {
                applied.insert(key, other);
            }
        }
    }
}

/// `System.config(...)` or `SystemJS.config(...)`, parentheses allowed
fn config_call<'e, 'a>(expression: &'e Expression<'a>) -> Option<&'e CallExpression<'a>> {
    match expression {
        Expression::ParenthesizedExpression(inner) => config_call(&inner.expression),
        Expression::CallExpression(call) => {
            let Expression::StaticMemberExpression(member) = &call.callee else {
                return None;
            };
            let Expression::Identifier(receiver) = &member.object else {
                return None;
            };
            (member.property.name.as_str() == "config"
                && CONFIG_RECEIVERS.contains(&receiver.name.as_str()))
            .then_some(&**call)
        }
        _ => None,
    }
}

fn unsupported(offset: u32, what: &str) -> ConfigError {
    ConfigError::Unsupported {
        offset: offset as usize,
        message: format!("{what} is not a literal value"),
    }
}

fn object_value(object: &ObjectExpression<'_>) -> Result<Map<String, Value>, ConfigError> {
    let mut entries = Map::new();

    for property in &object.properties {
        let ObjectPropertyKind::ObjectProperty(property) = property else {
            return Err(unsupported(property.span().start, "spread property"));
        };
        if property.kind != PropertyKind::Init || property.method || property.computed {
            return Err(unsupported(property.span.start, "accessor or computed property"));
        }

        let key = match &property.key {
            PropertyKey::StaticIdentifier(ident) => ident.name.to_string(),
            PropertyKey::StringLiteral(lit) => lit.value.to_string(),
            PropertyKey::NumericLiteral(lit) => lit.value.to_string(),
            other => return Err(unsupported(other.span().start, "property key")),
        };
        entries.insert(key, literal_value(&property.value)?);
    }

    Ok(entries)
}

fn literal_value(expression: &Expression<'_>) -> Result<Value, ConfigError> {
    match expression {
        Expression::ObjectExpression(object) => object_value(object).map(Value::Object),
        Expression::ArrayExpression(array) => {
            let mut items = Vec::with_capacity(array.elements.len());
            for element in &array.elements {
                let item = match element {
                    ArrayExpressionElement::Elision(_) => Value::Null,
                    ArrayExpressionElement::SpreadElement(spread) => {
                        return Err(unsupported(spread.span.start, "spread element"));
                    }
                    other => match other.as_expression() {
                        Some(expression) => literal_value(expression)?,
                        None => return Err(unsupported(other.span().start, "array element")),
                    },
                };
                items.push(item);
            }
            Ok(Value::Array(items))
        }
        Expression::StringLiteral(lit) => Ok(Value::String(lit.value.to_string())),
        Expression::NumericLiteral(lit) => Ok(number_value(lit.value)),
        Expression::BooleanLiteral(lit) => Ok(Value::Bool(lit.value)),
        Expression::NullLiteral(_) => Ok(Value::Null),
        Expression::Identifier(ident) if ident.name.as_str() == "undefined" => Ok(Value::Null),
        Expression::TemplateLiteral(template) if template.expressions.is_empty() => {
            let cooked = template
                .quasis
                .iter()
                .filter_map(|quasi| quasi.value.cooked.as_ref())
                .map(|part| part.as_str())
                .collect::<String>();
            Ok(Value::String(cooked))
        }
        Expression::UnaryExpression(unary) if unary.operator == UnaryOperator::UnaryNegation => {
            match &unary.argument {
                Expression::NumericLiteral(lit) => Ok(number_value(-lit.value)),
                other => Err(unsupported(other.span().start, "negated expression")),
            }
        }
        Expression::ParenthesizedExpression(inner) => literal_value(&inner.expression),
        other => Err(unsupported(other.span().start, "expression")),
    }
}

/// Integral values stay integers so they round-trip unchanged
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}
