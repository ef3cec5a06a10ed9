//! Tree-walking evaluator for the transform DSL.
//!
//! The evaluator owns a flat variable environment and a step budget.
//! Every statement and expression costs one step; exhausting the budget
//! aborts the run. The only ambient capability is the `datetime`
//! parse/format bridge backed by chrono.

use std::collections::HashMap;

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{AppError, ErrorKind};
use crate::script::ast::{AssignTarget, BinOp, BoolOp, CmpOp, Expr, Function, Stmt, UnaryOp};
use crate::script::value::Value;

const STEP_BUDGET: u64 = 200_000;
const MAX_RANGE_LEN: i64 = 100_000;
const ALLOWED_MODULES: &[&str] = &["datetime", "math"];

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Sandbox {
    env: HashMap<String, Value>,
    steps: u64,
}

/// Run a parsed transform routine against one raw input cell.
///
/// The cell is coerced to a number when it parses as one, otherwise it
/// is passed as a string. A routine that fails on the coerced value is
/// retried once with the raw string, so string-formatting routines
/// still work over numeric-looking cells. The result is rendered with
/// `str()` rules so it can be compared against expected targets.
pub fn run_transform(func: &Function, raw_cell: &str) -> Result<String, AppError> {
    let coerced = value_from_cell(raw_cell);
    let was_string = matches!(coerced, Value::Str(_));

    let mut sandbox = Sandbox::new();
    match sandbox.run(func, coerced) {
        Ok(result) => Ok(result.py_str()),
        Err(err) if !was_string => {
            let mut sandbox = Sandbox::new();
            let result = sandbox
                .run(func, Value::Str(raw_cell.to_string()))
                .map_err(|_| err)?;
            Ok(result.py_str())
        }
        Err(err) => Err(err),
    }
}

/// Coerce a raw table cell into a runtime value.
pub fn value_from_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_finite() {
            return Value::Float(v);
        }
    }
    Value::Str(raw.to_string())
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Sandbox {
            env: HashMap::new(),
            steps: 0,
        }
    }

    pub fn run(&mut self, func: &Function, input: Value) -> Result<Value, AppError> {
        self.env.clear();
        self.steps = 0;
        self.env.insert(func.param.clone(), input);
        match self.exec_block(&func.body)? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::None),
        }
    }

    fn tick(&mut self) -> Result<(), AppError> {
        self.steps += 1;
        if self.steps > STEP_BUDGET {
            return Err(self.error("evaluation step budget exhausted"));
        }
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> AppError {
        AppError::new(ErrorKind::Script, message.into())
    }

    // Statements

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, AppError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, AppError> {
        self.tick()?;
        match stmt {
            Stmt::Assign { target, value } => {
                let value = self.eval(value)?;
                match target {
                    AssignTarget::Name(name) => {
                        self.env.insert(name.clone(), value);
                    }
                    AssignTarget::Index { name, index } => {
                        let index = self.eval(index)?;
                        self.assign_index(name, index, value)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::AugAssign { name, op, value } => {
                let rhs = self.eval(value)?;
                let lhs = self
                    .env
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.error(format!("name '{name}' is not defined")))?;
                let result = self.binary(*op, lhs, rhs)?;
                self.env.insert(name.clone(), result);
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If { branches, orelse } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.truthy() {
                        return self.exec_block(body);
                    }
                }
                self.exec_block(orelse)
            }
            Stmt::For { var, iter, body } => {
                let iter_value = self.eval(iter)?;
                let items = self.iterable(iter_value)?;
                for item in items {
                    self.tick()?;
                    self.env.insert(var.clone(), item);
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::While { cond, body } => {
                while self.eval(cond)?.truthy() {
                    self.tick()?;
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Pass => Ok(Flow::Normal),
            Stmt::Import(module) => {
                if ALLOWED_MODULES.contains(&module.as_str()) {
                    Ok(Flow::Normal)
                } else {
                    Err(self.error(format!("module '{module}' is not available")))
                }
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn assign_index(&mut self, name: &str, index: Value, value: Value) -> Result<(), AppError> {
        let slot = self
            .env
            .get_mut(name)
            .ok_or_else(|| AppError::new(ErrorKind::Script, format!("name '{name}' is not defined")))?;
        match slot {
            Value::List(items) => {
                let idx = normalize_index(&index, items.len())
                    .ok_or_else(|| AppError::new(ErrorKind::Script, "list index out of range"))?;
                items[idx] = value;
                Ok(())
            }
            Value::Dict(items) => {
                if let Some(entry) = items.iter_mut().find(|(k, _)| k.loose_eq(&index)) {
                    entry.1 = value;
                } else {
                    items.push((index, value));
                }
                Ok(())
            }
            other => Err(AppError::new(
                ErrorKind::Script,
                format!("'{}' does not support item assignment", other.type_name()),
            )),
        }
    }

    fn iterable(&self, value: Value) -> Result<Vec<Value>, AppError> {
        match value {
            Value::List(items) => Ok(items),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Dict(items) => Ok(items.into_iter().map(|(k, _)| k).collect()),
            other => Err(self.error(format!("'{}' is not iterable", other.type_name()))),
        }
    }

    // Expressions

    fn eval(&mut self, expr: &Expr) -> Result<Value, AppError> {
        self.tick()?;
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Float(v) => Ok(Value::Float(*v)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Name(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| self.error(format!("name '{name}' is not defined"))),
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::List(out))
            }
            Expr::Dict(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (k, v) in items {
                    out.push((self.eval(k)?, self.eval(v)?));
                }
                Ok(Value::Dict(out))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => match value {
                        Value::Int(v) => Ok(Value::Int(-v)),
                        Value::Float(v) => Ok(Value::Float(-v)),
                        Value::Bool(b) => Ok(Value::Int(if b { -1 } else { 0 })),
                        other => Err(self.error(format!(
                            "cannot negate '{}'",
                            other.type_name()
                        ))),
                    },
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                self.binary(*op, lhs, rhs)
            }
            Expr::BoolChain { op, terms } => {
                // Operands short-circuit and the deciding operand is the
                // result, as in the source language.
                let mut last = Value::None;
                for term in terms {
                    last = self.eval(term)?;
                    match op {
                        BoolOp::And if !last.truthy() => return Ok(last),
                        BoolOp::Or if last.truthy() => return Ok(last),
                        _ => {}
                    }
                }
                Ok(last)
            }
            Expr::Compare { lhs, ops } => {
                let mut left = self.eval(lhs)?;
                for (op, rhs_expr) in ops {
                    let right = self.eval(rhs_expr)?;
                    if !self.compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Cond { test, then, orelse } => {
                if self.eval(test)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Call { func, args } => self.eval_call(func, args),
            Expr::Attr { obj, name } => self.eval_attr(obj, name),
            Expr::Index { obj, index } => {
                let obj = self.eval(obj)?;
                let index = self.eval(index)?;
                self.index(obj, index)
            }
            Expr::Slice { obj, lo, hi, step } => {
                let obj = self.eval(obj)?;
                let lo = self.eval_opt(lo)?;
                let hi = self.eval_opt(hi)?;
                let step = self.eval_opt(step)?;
                self.slice(obj, lo, hi, step)
            }
        }
    }

    fn eval_opt(&mut self, expr: &Option<Box<Expr>>) -> Result<Option<i64>, AppError> {
        match expr {
            None => Ok(None),
            Some(expr) => match self.eval(expr)? {
                Value::Int(v) => Ok(Some(v)),
                Value::None => Ok(None),
                other => Err(self.error(format!(
                    "slice bound must be an int, got '{}'",
                    other.type_name()
                ))),
            },
        }
    }

    fn binary(&self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, AppError> {
        use BinOp::*;
        match (op, &lhs, &rhs) {
            (Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Add, Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::List(out))
            }
            (Mul, Value::Str(s), Value::Int(n)) | (Mul, Value::Int(n), Value::Str(s)) => {
                let n = (*n).clamp(0, MAX_RANGE_LEN) as usize;
                Ok(Value::Str(s.repeat(n)))
            }
            (Mul, Value::List(items), Value::Int(n)) | (Mul, Value::Int(n), Value::List(items)) => {
                let n = (*n).clamp(0, MAX_RANGE_LEN) as usize;
                let mut out = Vec::with_capacity(items.len() * n);
                for _ in 0..n {
                    out.extend(items.iter().cloned());
                }
                Ok(Value::List(out))
            }
            _ => self.numeric_binary(op, &lhs, &rhs),
        }
    }

    fn numeric_binary(&self, op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, AppError> {
        let (a, b) = match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(self.error(format!(
                    "unsupported operand types '{}' and '{}'",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            }
        };
        let both_int = matches!(lhs, Value::Int(_) | Value::Bool(_))
            && matches!(rhs, Value::Int(_) | Value::Bool(_));

        // Integer arithmetic stays integral where the source language
        // keeps it integral; overflow falls back to floats.
        if both_int {
            let ai = a as i64;
            let bi = b as i64;
            match op {
                BinOp::Add => {
                    if let Some(v) = ai.checked_add(bi) {
                        return Ok(Value::Int(v));
                    }
                }
                BinOp::Sub => {
                    if let Some(v) = ai.checked_sub(bi) {
                        return Ok(Value::Int(v));
                    }
                }
                BinOp::Mul => {
                    if let Some(v) = ai.checked_mul(bi) {
                        return Ok(Value::Int(v));
                    }
                }
                BinOp::FloorDiv => {
                    if bi == 0 {
                        return Err(self.error("integer division by zero"));
                    }
                    return Ok(Value::Int(ai.div_euclid(bi)));
                }
                BinOp::Mod => {
                    if bi == 0 {
                        return Err(self.error("integer modulo by zero"));
                    }
                    return Ok(Value::Int(ai.rem_euclid(bi)));
                }
                BinOp::Pow => {
                    if (0..=63).contains(&bi) {
                        if let Some(v) = ai.checked_pow(bi as u32) {
                            return Ok(Value::Int(v));
                        }
                    }
                }
                BinOp::Div => {}
            }
        }

        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => {
                if b == 0.0 {
                    return Err(self.error("division by zero"));
                }
                a / b
            }
            BinOp::FloorDiv => {
                if b == 0.0 {
                    return Err(self.error("division by zero"));
                }
                (a / b).floor()
            }
            BinOp::Mod => {
                if b == 0.0 {
                    return Err(self.error("modulo by zero"));
                }
                a - b * (a / b).floor()
            }
            BinOp::Pow => a.powf(b),
        };
        Ok(Value::Float(result))
    }

    fn compare(&self, op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, AppError> {
        use std::cmp::Ordering;
        match op {
            CmpOp::Eq => Ok(lhs.loose_eq(rhs)),
            CmpOp::Ne => Ok(!lhs.loose_eq(rhs)),
            CmpOp::In => self.contains(rhs, lhs),
            CmpOp::NotIn => Ok(!self.contains(rhs, lhs)?),
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                let ord = lhs.partial_order(rhs).ok_or_else(|| {
                    self.error(format!(
                        "cannot order '{}' and '{}'",
                        lhs.type_name(),
                        rhs.type_name()
                    ))
                })?;
                Ok(match op {
                    CmpOp::Lt => ord == Ordering::Less,
                    CmpOp::Le => ord != Ordering::Greater,
                    CmpOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                })
            }
        }
    }

    fn contains(&self, container: &Value, needle: &Value) -> Result<bool, AppError> {
        match container {
            Value::Str(haystack) => match needle {
                Value::Str(n) => Ok(haystack.contains(n.as_str())),
                other => Err(self.error(format!(
                    "'in <str>' needs a string, got '{}'",
                    other.type_name()
                ))),
            },
            Value::List(items) => Ok(items.iter().any(|v| v.loose_eq(needle))),
            Value::Dict(items) => Ok(items.iter().any(|(k, _)| k.loose_eq(needle))),
            other => Err(self.error(format!("'{}' is not a container", other.type_name()))),
        }
    }

    fn index(&self, obj: Value, index: Value) -> Result<Value, AppError> {
        match obj {
            Value::List(items) => {
                let idx = normalize_index(&index, items.len())
                    .ok_or_else(|| self.error("list index out of range"))?;
                Ok(items[idx].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = normalize_index(&index, chars.len())
                    .ok_or_else(|| self.error("string index out of range"))?;
                Ok(Value::Str(chars[idx].to_string()))
            }
            Value::Dict(items) => items
                .iter()
                .find(|(k, _)| k.loose_eq(&index))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| self.error(format!("key {} not found", index.py_repr()))),
            other => Err(self.error(format!("'{}' is not subscriptable", other.type_name()))),
        }
    }

    fn slice(
        &self,
        obj: Value,
        lo: Option<i64>,
        hi: Option<i64>,
        step: Option<i64>,
    ) -> Result<Value, AppError> {
        match obj {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let picked = slice_indices(chars.len(), lo, hi, step)
                    .map_err(|msg| self.error(msg))?;
                Ok(Value::Str(picked.into_iter().map(|i| chars[i]).collect()))
            }
            Value::List(items) => {
                let picked = slice_indices(items.len(), lo, hi, step)
                    .map_err(|msg| self.error(msg))?;
                Ok(Value::List(
                    picked.into_iter().map(|i| items[i].clone()).collect(),
                ))
            }
            other => Err(self.error(format!("'{}' cannot be sliced", other.type_name()))),
        }
    }

    // Calls

    fn eval_call(&mut self, func: &Expr, args: &[Expr]) -> Result<Value, AppError> {
        // Module-path calls like datetime.datetime.strptime(...) are
        // dispatched before general evaluation since modules are not
        // first-class values.
        if let Some(path) = dotted_path(func) {
            if ALLOWED_MODULES.contains(&path[0].as_str()) && !self.env.contains_key(&path[0]) {
                let args = self.eval_args(args)?;
                return self.module_call(&path, args);
            }
        }

        match func {
            Expr::Name(name) => {
                let args = self.eval_args(args)?;
                self.builtin_call(name, args)
            }
            Expr::Attr { obj, name } => {
                // Mutating list methods write back through the variable.
                if let Expr::Name(var) = obj.as_ref() {
                    if matches!(name.as_str(), "append" | "extend" | "insert" | "pop" | "sort" | "reverse")
                        && matches!(self.env.get(var), Some(Value::List(_)))
                    {
                        let args = self.eval_args(args)?;
                        return self.list_mutation(var, name, args);
                    }
                }
                let target = self.eval(obj)?;
                let args = self.eval_args(args)?;
                self.method_call(target, name, args)
            }
            other => Err(self.error(format!("{other:?} is not callable"))),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, AppError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(self.eval(arg)?);
        }
        Ok(out)
    }

    fn eval_attr(&mut self, obj: &Expr, name: &str) -> Result<Value, AppError> {
        if let Some(path) = dotted_path_with(obj, name) {
            if path[0] == "math" && !self.env.contains_key("math") {
                return match path.last().map(String::as_str) {
                    Some("pi") => Ok(Value::Float(std::f64::consts::PI)),
                    Some("e") => Ok(Value::Float(std::f64::consts::E)),
                    _ => Err(self.error(format!("unknown attribute 'math.{name}'"))),
                };
            }
            if path[0] == "datetime" && !self.env.contains_key("datetime") {
                // Bare `datetime.datetime` only makes sense as a call
                // target, which eval_call handles.
                return Err(self.error(format!("'{}' is not a value", path.join("."))));
            }
        }

        let value = self.eval(obj)?;
        match (&value, name) {
            (Value::Date(d), "year") => Ok(Value::Int(i64::from(d.year()))),
            (Value::Date(d), "month") => Ok(Value::Int(i64::from(d.month()))),
            (Value::Date(d), "day") => Ok(Value::Int(i64::from(d.day()))),
            (Value::Date(d), "hour") => Ok(Value::Int(i64::from(d.hour()))),
            (Value::Date(d), "minute") => Ok(Value::Int(i64::from(d.minute()))),
            (Value::Date(d), "second") => Ok(Value::Int(i64::from(d.second()))),
            _ => Err(self.error(format!(
                "'{}' has no attribute '{name}'",
                value.type_name()
            ))),
        }
    }

    fn module_call(&self, path: &[String], args: Vec<Value>) -> Result<Value, AppError> {
        let func = path.last().map(String::as_str).unwrap_or_default();
        match path[0].as_str() {
            "datetime" => match func {
                "strptime" => self.datetime_strptime(&args),
                other => Err(self.error(format!("datetime has no function '{other}'"))),
            },
            "math" => {
                let x = args
                    .first()
                    .and_then(Value::as_number)
                    .ok_or_else(|| self.error(format!("math.{func} needs a number")))?;
                let result = match func {
                    "floor" => return Ok(Value::Int(x.floor() as i64)),
                    "ceil" => return Ok(Value::Int(x.ceil() as i64)),
                    "sqrt" => x.sqrt(),
                    "fabs" => x.abs(),
                    "exp" => x.exp(),
                    "log" => match args.get(1).and_then(Value::as_number) {
                        Some(base) => x.log(base),
                        None => x.ln(),
                    },
                    "log10" => x.log10(),
                    "pow" => {
                        let y = args
                            .get(1)
                            .and_then(Value::as_number)
                            .ok_or_else(|| self.error("math.pow needs two numbers"))?;
                        x.powf(y)
                    }
                    other => {
                        return Err(self.error(format!("math has no function '{other}'")));
                    }
                };
                Ok(Value::Float(result))
            }
            other => Err(self.error(format!("module '{other}' is not available"))),
        }
    }

    fn datetime_strptime(&self, args: &[Value]) -> Result<Value, AppError> {
        let (text, fmt) = match (args.first(), args.get(1)) {
            (Some(Value::Str(text)), Some(Value::Str(fmt))) => (text, fmt),
            _ => return Err(self.error("strptime needs (string, format)")),
        };
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(Value::Date(dt));
        }
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(Value::Date(dt));
            }
        }
        Err(self.error(format!(
            "time data '{text}' does not match format '{fmt}'"
        )))
    }

    fn list_mutation(&mut self, var: &str, method: &str, args: Vec<Value>) -> Result<Value, AppError> {
        let Some(Value::List(items)) = self.env.get_mut(var) else {
            return Err(AppError::new(
                ErrorKind::Script,
                format!("'{var}' is not a list"),
            ));
        };
        match method {
            "append" => {
                let value = args
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::new(ErrorKind::Script, "append needs a value"))?;
                items.push(value);
                Ok(Value::None)
            }
            "extend" => {
                match args.into_iter().next() {
                    Some(Value::List(more)) => items.extend(more),
                    _ => return Err(AppError::new(ErrorKind::Script, "extend needs a list")),
                }
                Ok(Value::None)
            }
            "insert" => {
                let mut it = args.into_iter();
                let (Some(Value::Int(pos)), Some(value)) = (it.next(), it.next()) else {
                    return Err(AppError::new(ErrorKind::Script, "insert needs (index, value)"));
                };
                let pos = pos.clamp(0, items.len() as i64) as usize;
                items.insert(pos, value);
                Ok(Value::None)
            }
            "pop" => {
                if items.is_empty() {
                    return Err(AppError::new(ErrorKind::Script, "pop from empty list"));
                }
                match args.first() {
                    None => Ok(items.pop().unwrap_or(Value::None)),
                    Some(idx) => {
                        let idx = normalize_index(idx, items.len()).ok_or_else(|| {
                            AppError::new(ErrorKind::Script, "pop index out of range")
                        })?;
                        Ok(items.remove(idx))
                    }
                }
            }
            "sort" => {
                let mut failed = false;
                items.sort_by(|a, b| {
                    a.partial_order(b).unwrap_or_else(|| {
                        failed = true;
                        std::cmp::Ordering::Equal
                    })
                });
                if failed {
                    return Err(AppError::new(ErrorKind::Script, "cannot sort mixed types"));
                }
                Ok(Value::None)
            }
            "reverse" => {
                items.reverse();
                Ok(Value::None)
            }
            other => Err(AppError::new(
                ErrorKind::Script,
                format!("list has no method '{other}'"),
            )),
        }
    }

    fn builtin_call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, AppError> {
        match name {
            "str" => Ok(Value::Str(
                args.first().map(Value::py_str).unwrap_or_default(),
            )),
            "int" => match args.first() {
                Some(Value::Int(v)) => Ok(Value::Int(*v)),
                Some(Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
                Some(Value::Float(v)) => Ok(Value::Int(v.trunc() as i64)),
                Some(Value::Str(s)) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| self.error(format!("invalid literal for int(): '{s}'"))),
                _ => Err(self.error("int() needs an argument")),
            },
            "float" => match args.first() {
                Some(v) if v.as_number().is_some() => {
                    Ok(Value::Float(v.as_number().unwrap_or_default()))
                }
                Some(Value::Str(s)) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| self.error(format!("could not convert '{s}' to float"))),
                _ => Err(self.error("float() needs an argument")),
            },
            "bool" => Ok(Value::Bool(args.first().is_some_and(Value::truthy))),
            "len" => match args.first() {
                Some(Value::Str(s)) => Ok(Value::Int(s.chars().count() as i64)),
                Some(Value::List(items)) => Ok(Value::Int(items.len() as i64)),
                Some(Value::Dict(items)) => Ok(Value::Int(items.len() as i64)),
                Some(other) => Err(self.error(format!(
                    "'{}' has no len()",
                    other.type_name()
                ))),
                None => Err(self.error("len() needs an argument")),
            },
            "abs" => match args.first() {
                Some(Value::Int(v)) => Ok(Value::Int(v.abs())),
                Some(v) if v.as_number().is_some() => {
                    Ok(Value::Float(v.as_number().unwrap_or_default().abs()))
                }
                _ => Err(self.error("abs() needs a number")),
            },
            "round" => {
                let x = args
                    .first()
                    .and_then(Value::as_number)
                    .ok_or_else(|| self.error("round() needs a number"))?;
                match args.get(1) {
                    Some(Value::Int(digits)) => {
                        let factor = 10f64.powi((*digits).clamp(-12, 12) as i32);
                        Ok(Value::Float((x * factor).round() / factor))
                    }
                    _ => Ok(Value::Int(x.round() as i64)),
                }
            }
            "min" | "max" => {
                let items = if args.len() == 1 {
                    match args.into_iter().next() {
                        Some(Value::List(items)) => items,
                        Some(other) => vec![other],
                        None => vec![],
                    }
                } else {
                    args
                };
                if items.is_empty() {
                    return Err(self.error(format!("{name}() of empty sequence")));
                }
                let mut best = items[0].clone();
                for item in &items[1..] {
                    let ord = item.partial_order(&best).ok_or_else(|| {
                        self.error(format!("{name}() of unorderable values"))
                    })?;
                    let take = if name == "min" {
                        ord == std::cmp::Ordering::Less
                    } else {
                        ord == std::cmp::Ordering::Greater
                    };
                    if take {
                        best = item.clone();
                    }
                }
                Ok(best)
            }
            "sum" => match args.first() {
                Some(Value::List(items)) => {
                    let mut total = 0.0;
                    let mut all_int = true;
                    for item in items {
                        let v = item
                            .as_number()
                            .ok_or_else(|| self.error("sum() of non-numeric list"))?;
                        all_int &= matches!(item, Value::Int(_) | Value::Bool(_));
                        total += v;
                    }
                    if all_int && total.abs() < 9e15 {
                        Ok(Value::Int(total as i64))
                    } else {
                        Ok(Value::Float(total))
                    }
                }
                _ => Err(self.error("sum() needs a list")),
            },
            "ord" => match args.first() {
                Some(Value::Str(s)) if s.chars().count() == 1 => {
                    Ok(Value::Int(i64::from(u32::from(
                        s.chars().next().unwrap_or('\0'),
                    ))))
                }
                _ => Err(self.error("ord() needs a single character")),
            },
            "chr" => match args.first() {
                Some(Value::Int(v)) => {
                    let c = u32::try_from(*v)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error("chr() out of range"))?;
                    Ok(Value::Str(c.to_string()))
                }
                _ => Err(self.error("chr() needs an int")),
            },
            "range" => {
                let nums: Vec<i64> = args
                    .iter()
                    .map(|v| match v {
                        Value::Int(v) => Ok(*v),
                        other => {
                            Err(self.error(format!("range() needs ints, got '{}'", other.type_name())))
                        }
                    })
                    .collect::<Result<_, _>>()?;
                let (start, stop, step) = match nums.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => return Err(self.error("range() takes 1 to 3 arguments")),
                };
                if step == 0 {
                    return Err(self.error("range() step must not be zero"));
                }
                let mut out = Vec::new();
                let mut i = start;
                while (step > 0 && i < stop) || (step < 0 && i > stop) {
                    out.push(Value::Int(i));
                    if out.len() as i64 >= MAX_RANGE_LEN {
                        return Err(self.error("range() is too long"));
                    }
                    i += step;
                }
                Ok(Value::List(out))
            }
            "sorted" => {
                let Some(Value::List(mut items)) = args.into_iter().next() else {
                    return Err(self.error("sorted() needs a list"));
                };
                let mut failed = false;
                items.sort_by(|a, b| {
                    a.partial_order(b).unwrap_or_else(|| {
                        failed = true;
                        std::cmp::Ordering::Equal
                    })
                });
                if failed {
                    return Err(self.error("cannot sort mixed types"));
                }
                Ok(Value::List(items))
            }
            "reversed" => match args.into_iter().next() {
                Some(Value::List(mut items)) => {
                    items.reverse();
                    Ok(Value::List(items))
                }
                Some(Value::Str(s)) => Ok(Value::Str(s.chars().rev().collect())),
                _ => Err(self.error("reversed() needs a list or string")),
            },
            other => Err(self.error(format!("name '{other}' is not defined"))),
        }
    }

    fn method_call(&mut self, target: Value, name: &str, args: Vec<Value>) -> Result<Value, AppError> {
        match target {
            Value::Str(s) => self.str_method(&s, name, args),
            Value::Dict(items) => self.dict_method(&items, name, args),
            Value::Date(d) => match name {
                "strftime" => match args.first() {
                    Some(Value::Str(fmt)) => self.strftime(&d, fmt),
                    _ => Err(self.error("strftime needs a format string")),
                },
                other => Err(self.error(format!("datetime has no method '{other}'"))),
            },
            Value::List(items) => match name {
                // Non-mutating list methods; mutating ones are handled
                // at the call site so they can write back.
                "index" => {
                    let needle = args
                        .first()
                        .ok_or_else(|| self.error("index() needs a value"))?;
                    items
                        .iter()
                        .position(|v| v.loose_eq(needle))
                        .map(|i| Value::Int(i as i64))
                        .ok_or_else(|| self.error("value not in list"))
                }
                "count" => {
                    let needle = args
                        .first()
                        .ok_or_else(|| self.error("count() needs a value"))?;
                    Ok(Value::Int(
                        items.iter().filter(|v| v.loose_eq(needle)).count() as i64,
                    ))
                }
                other => Err(self.error(format!("list has no method '{other}'"))),
            },
            other => Err(self.error(format!(
                "'{}' has no method '{name}'",
                other.type_name()
            ))),
        }
    }

    fn strftime(&self, d: &NaiveDateTime, fmt: &str) -> Result<Value, AppError> {
        let items: Vec<Item> = StrftimeItems::new(fmt).collect();
        if items.iter().any(|i| matches!(i, Item::Error)) {
            return Err(self.error(format!("invalid strftime format '{fmt}'")));
        }
        Ok(Value::Str(d.format_with_items(items.into_iter()).to_string()))
    }

    fn dict_method(
        &self,
        items: &[(Value, Value)],
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, AppError> {
        match name {
            "get" => {
                let key = args
                    .first()
                    .ok_or_else(|| self.error("get() needs a key"))?;
                Ok(items
                    .iter()
                    .find(|(k, _)| k.loose_eq(key))
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
            }
            "keys" => Ok(Value::List(items.iter().map(|(k, _)| k.clone()).collect())),
            "values" => Ok(Value::List(items.iter().map(|(_, v)| v.clone()).collect())),
            "items" => Ok(Value::List(
                items
                    .iter()
                    .map(|(k, v)| Value::List(vec![k.clone(), v.clone()]))
                    .collect(),
            )),
            other => Err(self.error(format!("dict has no method '{other}'"))),
        }
    }

    fn str_method(&mut self, s: &str, name: &str, args: Vec<Value>) -> Result<Value, AppError> {
        let arg_str = |i: usize| -> Option<String> {
            match args.get(i) {
                Some(Value::Str(v)) => Some(v.clone()),
                _ => None,
            }
        };
        match name {
            "upper" => Ok(Value::Str(s.to_uppercase())),
            "lower" => Ok(Value::Str(s.to_lowercase())),
            "swapcase" => Ok(Value::Str(
                s.chars()
                    .flat_map(|c| {
                        if c.is_uppercase() {
                            c.to_lowercase().collect::<Vec<_>>()
                        } else {
                            c.to_uppercase().collect::<Vec<_>>()
                        }
                    })
                    .collect(),
            )),
            "capitalize" => {
                let mut chars = s.chars();
                Ok(Value::Str(match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }))
            }
            "title" => {
                let mut out = String::with_capacity(s.len());
                let mut at_word_start = true;
                for c in s.chars() {
                    if c.is_alphabetic() {
                        if at_word_start {
                            out.extend(c.to_uppercase());
                        } else {
                            out.extend(c.to_lowercase());
                        }
                        at_word_start = false;
                    } else {
                        out.push(c);
                        at_word_start = true;
                    }
                }
                Ok(Value::Str(out))
            }
            "strip" | "lstrip" | "rstrip" => {
                let pattern = arg_str(0);
                let matches_set = |c: char| match &pattern {
                    Some(set) => set.contains(c),
                    None => c.is_whitespace(),
                };
                let out = match name {
                    "strip" => s.trim_matches(matches_set),
                    "lstrip" => s.trim_start_matches(matches_set),
                    _ => s.trim_end_matches(matches_set),
                };
                Ok(Value::Str(out.to_string()))
            }
            "replace" => {
                let (Some(from), Some(to)) = (arg_str(0), arg_str(1)) else {
                    return Err(self.error("replace() needs two strings"));
                };
                Ok(Value::Str(s.replace(&from, &to)))
            }
            "split" => match arg_str(0) {
                Some(sep) if !sep.is_empty() => Ok(Value::List(
                    s.split(&sep).map(|p| Value::Str(p.to_string())).collect(),
                )),
                Some(_) => Err(self.error("empty separator")),
                None => Ok(Value::List(
                    s.split_whitespace()
                        .map(|p| Value::Str(p.to_string()))
                        .collect(),
                )),
            },
            "join" => match args.first() {
                Some(Value::List(items)) => {
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::Str(part) => parts.push(part.clone()),
                            other => {
                                return Err(self.error(format!(
                                    "join() needs strings, got '{}'",
                                    other.type_name()
                                )));
                            }
                        }
                    }
                    Ok(Value::Str(parts.join(s)))
                }
                _ => Err(self.error("join() needs a list")),
            },
            "startswith" => Ok(Value::Bool(
                arg_str(0).is_some_and(|p| s.starts_with(&p)),
            )),
            "endswith" => Ok(Value::Bool(arg_str(0).is_some_and(|p| s.ends_with(&p)))),
            "find" => Ok(Value::Int(match arg_str(0) {
                Some(p) => s
                    .find(&p)
                    .map(|byte_idx| s[..byte_idx].chars().count() as i64)
                    .unwrap_or(-1),
                None => -1,
            })),
            "count" => Ok(Value::Int(match arg_str(0) {
                Some(p) if !p.is_empty() => s.matches(&p).count() as i64,
                _ => 0,
            })),
            "zfill" => match args.first() {
                Some(Value::Int(width)) => {
                    let width = (*width).clamp(0, MAX_RANGE_LEN) as usize;
                    let (sign, digits) = match s.strip_prefix('-') {
                        Some(rest) => ("-", rest),
                        None => ("", s),
                    };
                    let len = sign.len() + digits.chars().count();
                    let pad = width.saturating_sub(len);
                    Ok(Value::Str(format!("{sign}{}{digits}", "0".repeat(pad))))
                }
                _ => Err(self.error("zfill() needs a width")),
            },
            "ljust" | "rjust" => match args.first() {
                Some(Value::Int(width)) => {
                    let width = (*width).clamp(0, MAX_RANGE_LEN) as usize;
                    let fill = arg_str(1)
                        .and_then(|f| f.chars().next())
                        .unwrap_or(' ');
                    let len = s.chars().count();
                    let pad: String = std::iter::repeat(fill)
                        .take(width.saturating_sub(len))
                        .collect();
                    Ok(Value::Str(if name == "ljust" {
                        format!("{s}{pad}")
                    } else {
                        format!("{pad}{s}")
                    }))
                }
                _ => Err(self.error(format!("{name}() needs a width"))),
            },
            "isdigit" => Ok(Value::Bool(
                !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
            )),
            "isalpha" => Ok(Value::Bool(
                !s.is_empty() && s.chars().all(char::is_alphabetic),
            )),
            "isalnum" => Ok(Value::Bool(
                !s.is_empty() && s.chars().all(char::is_alphanumeric),
            )),
            "isspace" => Ok(Value::Bool(
                !s.is_empty() && s.chars().all(char::is_whitespace),
            )),
            "isupper" => Ok(Value::Bool(
                s.chars().any(char::is_alphabetic)
                    && s.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase),
            )),
            "islower" => Ok(Value::Bool(
                s.chars().any(char::is_alphabetic)
                    && s.chars().filter(|c| c.is_alphabetic()).all(char::is_lowercase),
            )),
            "format" => self.str_format(s, &args),
            other => Err(self.error(format!("str has no method '{other}'"))),
        }
    }

    /// Minimal `str.format`: `{}`, `{0}`, `{:.Nf}`, and `{:0Nd}`.
    fn str_format(&self, template: &str, args: &[Value]) -> Result<Value, AppError> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        let mut next_positional = 0usize;
        while let Some(c) = chars.next() {
            if c == '{' {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut field = String::new();
                for inner in chars.by_ref() {
                    if inner == '}' {
                        break;
                    }
                    field.push(inner);
                }
                let (index_part, spec) = match field.split_once(':') {
                    Some((i, s)) => (i, Some(s)),
                    None => (field.as_str(), None),
                };
                let arg = if index_part.is_empty() {
                    let arg = args.get(next_positional);
                    next_positional += 1;
                    arg
                } else {
                    index_part.parse::<usize>().ok().and_then(|i| args.get(i))
                };
                let arg = arg.ok_or_else(|| self.error("format() index out of range"))?;
                out.push_str(&format_field(arg, spec).ok_or_else(|| {
                    self.error(format!("unsupported format spec '{field}'"))
                })?);
            } else if c == '}' {
                if chars.peek() == Some(&'}') {
                    chars.next();
                }
                out.push('}');
            } else {
                out.push(c);
            }
        }
        Ok(Value::Str(out))
    }
}

fn format_field(arg: &Value, spec: Option<&str>) -> Option<String> {
    let Some(spec) = spec else {
        return Some(arg.py_str());
    };
    if spec.is_empty() {
        return Some(arg.py_str());
    }
    // {:.Nf}
    if let Some(rest) = spec.strip_prefix('.') {
        if let Some(digits) = rest.strip_suffix('f') {
            let precision: usize = digits.parse().ok()?;
            let v = arg.as_number()?;
            return Some(format!("{v:.precision$}"));
        }
    }
    // {:0Nd}
    if let Some(rest) = spec.strip_prefix('0') {
        if let Some(digits) = rest.strip_suffix('d') {
            let width: usize = digits.parse().ok()?;
            let v = arg.as_number()? as i64;
            return Some(format!("{v:0width$}"));
        }
    }
    None
}

/// Collect a pure `Name.attr.attr` chain, outermost name first.
fn dotted_path(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::Name(name) => Some(vec![name.clone()]),
        Expr::Attr { obj, name } => {
            let mut path = dotted_path(obj)?;
            path.push(name.clone());
            Some(path)
        }
        _ => None,
    }
}

fn dotted_path_with(obj: &Expr, name: &str) -> Option<Vec<String>> {
    let mut path = dotted_path(obj)?;
    path.push(name.to_string());
    Some(path)
}

fn normalize_index(index: &Value, len: usize) -> Option<usize> {
    let raw = match index {
        Value::Int(v) => *v,
        Value::Bool(b) => i64::from(*b),
        _ => return None,
    };
    let len = len as i64;
    let idx = if raw < 0 { raw + len } else { raw };
    if (0..len).contains(&idx) {
        Some(idx as usize)
    } else {
        None
    }
}

/// Python-style slice index selection with negative bounds and step.
fn slice_indices(
    len: usize,
    lo: Option<i64>,
    hi: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, String> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err("slice step cannot be zero".to_string());
    }
    let len = len as i64;
    let clamp = |v: i64| -> i64 {
        let v = if v < 0 { v + len } else { v };
        v.clamp(-1, len)
    };

    let (start, stop) = if step > 0 {
        (
            clamp(lo.unwrap_or(0)).max(0),
            clamp(hi.unwrap_or(len)).max(0),
        )
    } else {
        (
            match lo {
                Some(v) => clamp(v).min(len - 1),
                None => len - 1,
            },
            match hi {
                Some(v) => clamp(v),
                None => -1,
            },
        )
    };

    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        if (0..len).contains(&i) {
            out.push(i as usize);
        }
        i += step;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::tokenize;
    use crate::script::parse::parse;

    fn run(source: &str, input: &str) -> Result<String, AppError> {
        let func = parse(tokenize(source).unwrap()).unwrap();
        run_transform(&func, input)
    }

    fn run_ok(source: &str, input: &str) -> String {
        run(source, input).unwrap()
    }

    #[test]
    fn numeric_cells_retry_as_strings_for_string_routines() {
        // "12" coerces to an int, which has no replace(); the retry
        // with the raw string carries the routine through.
        assert_eq!(
            run_ok("def transform(x):\n    return x.replace('1', '9')\n", "12"),
            "92"
        );
        // A routine that genuinely fails still reports the typed
        // run's error.
        assert!(run("def transform(x):\n    return x.frobnicate()\n", "12").is_err());
    }

    #[test]
    fn identity_and_arithmetic() {
        assert_eq!(run_ok("def transform(x):\n    return x\n", "abc"), "abc");
        assert_eq!(run_ok("def transform(x):\n    return x * 2\n", "21"), "42");
        assert_eq!(
            run_ok("def transform(x):\n    return x / 2\n", "5"),
            "2.5"
        );
        assert_eq!(
            run_ok("def transform(x):\n    return x // 2\n", "5"),
            "2"
        );
    }

    #[test]
    fn negative_modulo_matches_source_semantics() {
        assert_eq!(run_ok("def transform(x):\n    return x % 3\n", "-1"), "2");
        assert_eq!(run_ok("def transform(x):\n    return x // 2\n", "-5"), "-3");
    }

    #[test]
    fn string_methods_and_slicing() {
        assert_eq!(
            run_ok("def transform(x):\n    return x.upper()\n", "hello"),
            "HELLO"
        );
        assert_eq!(
            run_ok("def transform(x):\n    return x[::-1]\n", "abc"),
            "cba"
        );
        assert_eq!(
            run_ok("def transform(x):\n    return x.split('-')[0]\n", "a-b-c"),
            "a"
        );
        assert_eq!(
            run_ok(
                "def transform(x):\n    return '-'.join(x.split())\n",
                "a b c"
            ),
            "a-b-c"
        );
        assert_eq!(
            run_ok("def transform(x):\n    return x.zfill(5)\n", "-42"),
            "-0042"
        );
    }

    #[test]
    fn control_flow_and_loops() {
        let source = concat!(
            "def transform(x):\n",
            "    total = 0\n",
            "    for c in x:\n",
            "        if c.isdigit():\n",
            "            total += int(c)\n",
            "    return total\n",
        );
        assert_eq!(run_ok(source, "a1b2c3"), "6");
    }

    #[test]
    fn dict_and_list_operations() {
        let source = concat!(
            "def transform(x):\n",
            "    table = {'a': 1, 'b': 2}\n",
            "    return table.get(x, 0)\n",
        );
        assert_eq!(run_ok(source, "b"), "2");
        assert_eq!(run_ok(source, "zzz"), "0");

        let source = concat!(
            "def transform(x):\n",
            "    out = []\n",
            "    for part in x.split(','):\n",
            "        out.append(part.strip())\n",
            "    return ','.join(out)\n",
        );
        assert_eq!(run_ok(source, " a , b ,c"), "a,b,c");
    }

    #[test]
    fn datetime_bridge_round_trips() {
        let source = concat!(
            "import datetime\n",
            "\n",
            "def transform(x):\n",
            "    d = datetime.datetime.strptime(x, '%Y-%m-%d')\n",
            "    return d.strftime('%d/%m/%Y')\n",
        );
        assert_eq!(run_ok(source, "2024-03-05"), "05/03/2024");
    }

    #[test]
    fn disallowed_module_is_rejected() {
        let err = run("import os\n\ndef transform(x):\n    return x\n", "a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Script);
        assert!(err.to_string().contains("os"));
    }

    #[test]
    fn infinite_loop_hits_step_budget() {
        let err = run(
            "def transform(x):\n    while True:\n        pass\n    return x\n",
            "a",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Script);
        assert!(err.to_string().contains("budget"));
    }

    #[test]
    fn undefined_name_is_an_error() {
        let err = run("def transform(x):\n    return y\n", "a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Script);
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn numeric_result_renders_like_source_language() {
        assert_eq!(run_ok("def transform(x):\n    return x * 2.0\n", "2"), "4.0");
        assert_eq!(
            run_ok("def transform(x):\n    return float(x)\n", "7"),
            "7.0"
        );
    }

    #[test]
    fn string_format_specs() {
        assert_eq!(
            run_ok(
                "def transform(x):\n    return '{:.2f}'.format(float(x))\n",
                "3.14159"
            ),
            "3.14"
        );
        assert_eq!(
            run_ok(
                "def transform(x):\n    return '{:03d}'.format(int(x))\n",
                "7"
            ),
            "007"
        );
    }

    #[test]
    fn ternary_and_chained_compare() {
        let source = "def transform(x):\n    return 'mid' if 0 < x < 10 else 'out'\n";
        assert_eq!(run_ok(source, "5"), "mid");
        assert_eq!(run_ok(source, "15"), "out");
    }

    #[test]
    fn fallthrough_returns_none() {
        assert_eq!(run_ok("def transform(x):\n    pass\n", "a"), "None");
    }
}
