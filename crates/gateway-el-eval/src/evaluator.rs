//! Expression evaluator
//!
//! Walks a compiled template against an [`EvaluationContext`]. Evaluation is
//! synchronous: deferred values are returned as-is and resolved by the caller.

use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use crate::resolver::SecuredResolver;
use crate::whitelist::WhitelistRegistry;
use gateway_el_ast::{
    CompoundExpr, ConstructorExpr, Expression, FunctionCallExpr, InlineListExpr, InlineMapExpr,
    Literal, Segment, Spanned, Template,
};
use gateway_el_types::Value;
use indexmap::IndexMap;
use std::borrow::Cow;

/// Evaluates expressions for one request
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    resolver: SecuredResolver<'a>,
    context: &'a EvaluationContext,
}

impl<'a> Evaluator<'a> {
    pub fn new(whitelist: &'a WhitelistRegistry, context: &'a EvaluationContext) -> Self {
        Self {
            resolver: SecuredResolver::new(whitelist),
            context,
        }
    }

    pub fn resolver(&self) -> &SecuredResolver<'a> {
        &self.resolver
    }

    pub fn context(&self) -> &'a EvaluationContext {
        self.context
    }

    /// Evaluate a template.
    ///
    /// A template made of one fragment yields that fragment's value; any other
    /// template yields the concatenated text, with null fragments rendering
    /// as the empty string.
    pub fn evaluate_template(&self, template: &Template) -> EvalResult<Value> {
        if let Some(expr) = template.single_expression() {
            return self.evaluate(&expr.inner);
        }

        let mut text = String::new();
        for segment in &template.segments {
            match segment {
                Segment::Literal(literal) => text.push_str(literal),
                Segment::Expression(expr) => match self.evaluate(&expr.inner)? {
                    Value::Deferred(_) => return Err(EvalError::unresolved("template concatenation")),
                    value => text.push_str(&value.to_display_string()),
                },
            }
        }
        Ok(Value::String(text))
    }

    /// Main expression evaluation dispatcher
    pub fn evaluate(&self, expr: &Expression) -> EvalResult<Value> {
        match expr {
            // === Literals ===
            Expression::Literal(lit) => Ok(self.eval_literal(lit)),
            Expression::InlineList(list) => self.eval_inline_list(list),
            Expression::InlineMap(map) => self.eval_inline_map(map),

            // === References ===
            Expression::VariableRef(id) => Ok(self.eval_variable(id.as_str()).into_owned()),
            Expression::FunctionCall(call) => self.eval_function_call(call),
            Expression::TypeRef(name) => self.resolver.type_ref(name.as_str()),
            Expression::Constructor(ctor) => self.eval_constructor(ctor),

            // === Navigation ===
            Expression::Compound(compound) => self.eval_compound(compound),
            // A step without a chain root applies to the absent root object
            step @ (Expression::PropertyOrField(_) | Expression::MethodCall(_) | Expression::Indexer(_)) => {
                self.eval_step(&Value::Null, step)
            }

            // === Operators ===
            Expression::BinaryOp(op) => self.eval_binary(op),
            Expression::UnaryOp(op) => self.eval_unary(op),
            Expression::Ternary(t) => self.eval_ternary(t),
            Expression::Elvis(e) => self.eval_elvis(e),
            Expression::Parenthesized(inner) => self.evaluate(&inner.inner),
        }
    }

    // =========================================================================
    // Literals and collections
    // =========================================================================

    pub fn eval_literal(&self, lit: &Literal) -> Value {
        match lit {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Long(l) => Value::Long(*l),
            Literal::Decimal(d) => Value::Decimal(*d),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    fn eval_inline_list(&self, list: &InlineListExpr) -> EvalResult<Value> {
        Ok(Value::List(self.eval_arguments(&list.elements)?))
    }

    fn eval_inline_map(&self, map: &InlineMapExpr) -> EvalResult<Value> {
        let mut entries = IndexMap::with_capacity(map.entries.len());
        for entry in &map.entries {
            let key = self.evaluate(&entry.key.inner)?.to_display_string();
            let value = self.evaluate(&entry.value.inner)?;
            entries.insert(key, value);
        }
        Ok(Value::Map(entries))
    }

    pub fn eval_arguments(&self, arguments: &[Spanned<Expression>]) -> EvalResult<Vec<Value>> {
        arguments.iter().map(|arg| self.evaluate(&arg.inner)).collect()
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Unbound variables read as null
    fn eval_variable(&self, name: &str) -> Cow<'a, Value> {
        match self.context.lookup_variable(name) {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(Value::Null),
        }
    }

    fn eval_function_call(&self, call: &FunctionCallExpr) -> EvalResult<Value> {
        let function = self
            .context
            .function(call.name.as_str())
            .ok_or_else(|| EvalError::UnknownFunction {
                name: call.name.to_string(),
            })?;
        let args = self.eval_arguments(&call.arguments)?;
        Ok(function(&args)?)
    }

    fn eval_constructor(&self, ctor: &ConstructorExpr) -> EvalResult<Value> {
        let args = self.eval_arguments(&ctor.arguments)?;
        self.resolver.construct(ctor.type_name.as_str(), &args)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    fn eval_compound(&self, compound: &CompoundExpr) -> EvalResult<Value> {
        let Some(root) = compound.root() else {
            return Ok(Value::Null);
        };

        // Variables are borrowed from the context; only the values steps
        // produce are owned
        let mut current: Cow<'a, Value> = match &root.inner {
            Expression::VariableRef(id) => self.eval_variable(id.as_str()),
            other => Cow::Owned(self.evaluate(other)?),
        };
        for step in compound.steps() {
            current = Cow::Owned(self.eval_step(&current, &step.inner)?);
        }
        Ok(current.into_owned())
    }

    /// Apply one property, method or index step to `target`
    fn eval_step(&self, target: &Value, step: &Expression) -> EvalResult<Value> {
        match step {
            Expression::PropertyOrField(property) => {
                self.resolver
                    .property(target, property.name.as_str(), property.null_safe)
            }
            Expression::MethodCall(call) => {
                // `?.` skips argument evaluation on a null receiver
                if call.null_safe && target.is_null() {
                    return Ok(Value::Null);
                }
                let args = self.eval_arguments(&call.arguments)?;
                self.resolver
                    .invoke(target, call.name.as_str(), &args, call.null_safe)
            }
            Expression::Indexer(indexer) => {
                let index = self.evaluate(&indexer.index.inner)?;
                self.resolver.index(target, &index)
            }
            other => Err(EvalError::invalid_operand(
                "navigation",
                format!("'{}' is not a navigation step", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_el_parser::Parser;
    use gateway_el_types::{Headers, HostError};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn eval_with(text: &str, context: &EvaluationContext) -> EvalResult<Value> {
        let whitelist = WhitelistRegistry::builtin();
        let template = Parser::new()
            .parse_template(text)
            .unwrap_or_else(|e| panic!("Failed to parse '{}': {:?}", text, e));
        Evaluator::new(&whitelist, context).evaluate_template(&template)
    }

    fn eval(text: &str) -> EvalResult<Value> {
        eval_with(text, &EvaluationContext::new())
    }

    fn request_context() -> EvaluationContext {
        let mut headers = Headers::new();
        headers
            .add("X-Gravitee-Endpoint", "my_api_host")
            .add("X-Gravitee-Endpoint", "second");
        let mut params = IndexMap::new();
        params.insert(
            "param".to_string(),
            Value::from(vec![Value::from("p1"), Value::from("p2")]),
        );
        let mut request = IndexMap::new();
        request.insert("headers".to_string(), Value::Headers(headers));
        request.insert("params".to_string(), Value::Map(params));

        let mut ctx = EvaluationContext::new();
        ctx.set_variable("request", Value::Map(request));
        ctx
    }

    #[rstest]
    #[case("{#request.headers['X-Gravitee-Endpoint'][0]}", Value::from("my_api_host"))]
    #[case("{#request.params['param'][1]}", Value::from("p2"))]
    #[case("{#request.headers['missing']}", Value::Null)]
    #[case("{#request?.missing?.name}", Value::Null)]
    fn test_navigation(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(eval_with(text, &request_context()).unwrap(), expected);
    }

    #[test]
    fn test_concatenated_template_renders_null_as_empty() {
        let value = eval_with("endpoint={#request.headers['missing']}/", &request_context()).unwrap();
        assert_eq!(value, Value::from("endpoint=/"));
    }

    #[test]
    fn test_literal_template_yields_text() {
        assert_eq!(eval("true").unwrap(), Value::from("true"));
    }

    #[test]
    fn test_null_navigation_without_safe_operator() {
        let err = eval_with("{#request.missing.name}", &request_context()).unwrap_err();
        assert!(matches!(err, EvalError::NullNavigation { .. }));
    }

    #[test]
    fn test_registered_function() {
        let mut ctx = EvaluationContext::new();
        ctx.register_function("greet", |args| match args {
            [Value::String(name)] => Ok(Value::from(format!("hello {}", name))),
            _ => Err(HostError::invalid_argument("expected a name")),
        });
        assert_eq!(eval_with("{#greet('world')}", &ctx).unwrap(), Value::from("hello world"));
        assert!(matches!(eval("{#greet('x')}"), Err(EvalError::UnknownFunction { .. })));
    }

    #[test]
    fn test_inline_collections() {
        let value = eval("{({'a': 1, b: {1, 2}})}").unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("a"), Some(&Value::Integer(1)));
        assert_eq!(
            map.get("b"),
            Some(&Value::from(vec![Value::Integer(1), Value::Integer(2)]))
        );
    }

    #[test]
    fn test_static_and_constructor_calls() {
        assert_eq!(eval("{T(java.lang.Math).abs(-1)}").unwrap(), Value::Integer(1));
        assert_eq!(
            eval("{(new java.lang.String('Gravitee').length())}").unwrap(),
            Value::Integer(8)
        );
    }

    #[test]
    fn test_bare_name_has_no_root_object() {
        assert!(matches!(eval("{(name)}"), Err(EvalError::NullNavigation { .. })));
    }
}
