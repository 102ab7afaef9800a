use std::{fmt, str::FromStr, sync::Arc};

use derive_more::From;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    record::{as_doc, as_seq, discriminator, expect_type, tag, Document, Record},
    Error, Result,
};

use super::Target;

/// Boolean operator of a [`TargetingCriterion`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// All operands must match.
    And,
    /// At least one operand must match.
    Or,
    /// The single operand must not match.
    Not,
}

impl Operator {
    /// Wire name of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AND" => Ok(Operator::And),
            "OR" => Ok(Operator::Or),
            "NOT" => Ok(Operator::Not),
            _ => Err(Error::InvalidCriterion(format!("unknown operator {s:?}"))),
        }
    }
}

/// Child of a criterion node: either a target leaf or a nested criterion.
#[derive(Debug, Clone, From)]
pub enum Operand {
    /// Leaf value.
    Target(Target),
    /// Nested expression.
    Criterion(TargetingCriterion),
}

impl Operand {
    fn to_doc(&self) -> Document {
        match self {
            Operand::Target(target) => target.to_doc(),
            Operand::Criterion(criterion) => criterion.to_doc(),
        }
    }

    fn from_doc(doc: &Document) -> Result<Self> {
        match discriminator(doc) {
            Some(TargetingCriterion::TYPE_NAME) => TargetingCriterion::from_doc(doc).map(Operand::from),
            _ => Target::from_doc(doc).map(Operand::from),
        }
    }
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        Shape::of_operand(self) == Shape::of_operand(other)
    }
}

impl Eq for Operand {}

/// A boolean expression over [`Target`] leaves.
///
/// Criteria are persistent: combining them with [`conjunction`](Self::conjunction),
/// [`disjunction`](Self::disjunction) or [`negation`](Self::negation) (or `&`, `|`, `!`) returns
/// a new criterion and never touches the inputs. Operands are shared between criteria, so cloning
/// is cheap.
///
/// Equality is structural and ignores AND/OR operand order. A single-operand AND/OR is equal to
/// its operand and nested groups of the same operator are compared as one flat group.
///
/// # Examples
/// ```
/// # use adtargeting::{Geography, Operator, Target, TargetingCriterion};
/// let usa = Geography { name: Some("United States".into()), ..Default::default() };
/// let canada = Geography { name: Some("Canada".into()), ..Default::default() };
///
/// let north_america = TargetingCriterion::new(
///     vec![Target::from(usa).into(), Target::from(canada).into()],
///     Operator::Or,
/// )?;
/// let elsewhere = !&north_america;
/// assert_eq!(!&elsewhere, north_america);
/// # Ok::<(), adtargeting::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TargetingCriterion {
    operator: Operator,
    operands: Arc<[Operand]>,
}

impl TargetingCriterion {
    /// Discriminator of criterion documents.
    pub const TYPE_NAME: &'static str = "TargetingCriterion";

    /// Create a criterion, checking operator arity.
    ///
    /// NOT takes exactly one operand; AND and OR take at least one.
    pub fn new(operands: Vec<Operand>, operator: Operator) -> Result<Self> {
        match (operator, operands.len()) {
            (Operator::Not, 1) => {}
            (Operator::Not, n) => {
                return Err(Error::InvalidCriterion(format!(
                    "NOT takes exactly one operand, got {n}"
                )))
            }
            (_, 0) => {
                return Err(Error::InvalidCriterion(format!(
                    "{operator} takes at least one operand"
                )))
            }
            _ => {}
        }
        Ok(TargetingCriterion {
            operator,
            operands: operands.into(),
        })
    }

    /// Wrap a single target as `OR [target]`.
    pub fn from_target(target: impl Into<Target>) -> Self {
        TargetingCriterion {
            operator: Operator::Or,
            operands: Arc::new([Operand::Target(target.into())]),
        }
    }

    #[allow(missing_docs)]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    #[allow(missing_docs)]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// `self AND other`. AND nodes and single-operand pass-throughs are absorbed instead of
    /// nested.
    pub fn conjunction(&self, other: &TargetingCriterion) -> TargetingCriterion {
        Self::combine(self, other, Operator::And)
    }

    /// `self OR other`. OR nodes and single-operand pass-throughs are absorbed instead of
    /// nested.
    pub fn disjunction(&self, other: &TargetingCriterion) -> TargetingCriterion {
        Self::combine(self, other, Operator::Or)
    }

    /// `NOT self`, with double negation eliminated.
    pub fn negation(&self) -> TargetingCriterion {
        match (self.operator, &*self.operands) {
            (Operator::Not, [Operand::Criterion(inner)]) => inner.clone(),
            (Operator::Not, [Operand::Target(target)]) => Self::from_target(target.clone()),
            (Operator::And | Operator::Or, [Operand::Target(target)]) => TargetingCriterion {
                operator: Operator::Not,
                operands: Arc::new([Operand::Target(target.clone())]),
            },
            _ => TargetingCriterion {
                operator: Operator::Not,
                operands: Arc::new([Operand::Criterion(self.clone())]),
            },
        }
    }

    fn combine(first: &Self, second: &Self, operator: Operator) -> Self {
        let mut operands = Vec::with_capacity(first.operands.len() + second.operands.len());
        for side in [first, second] {
            if side.absorbs_into(operator) {
                operands.extend(side.operands.iter().cloned());
            } else {
                operands.push(Operand::Criterion(side.clone()));
            }
        }
        TargetingCriterion {
            operator,
            operands: operands.into(),
        }
    }

    fn absorbs_into(&self, operator: Operator) -> bool {
        self.operator == operator || (self.operator != Operator::Not && self.operands.len() == 1)
    }

    /// All leaf targets, depth-first and left to right. Duplicates are kept.
    pub fn flatten(&self) -> Vec<&Target> {
        let mut targets = Vec::new();
        self.collect_targets(&mut targets);
        targets
    }

    fn collect_targets<'a>(&'a self, targets: &mut Vec<&'a Target>) {
        for operand in self.operands.iter() {
            match operand {
                Operand::Target(target) => targets.push(target),
                Operand::Criterion(criterion) => criterion.collect_targets(targets),
            }
        }
    }

    /// Split leaves into included targets (not under any NOT) and excluded ones (everything else).
    ///
    /// Both lists are deduplicated and keep first-seen order. This is only meaningful for simple
    /// shapes such as `OR [..] AND NOT OR [..]`.
    pub fn includes_and_excludes(&self) -> (Vec<&Target>, Vec<&Target>) {
        let mut includes = Vec::new();
        self.collect_includes(&mut includes);
        dedup(&mut includes);

        let mut excludes = self.flatten();
        excludes.retain(|target| !includes.contains(target));
        dedup(&mut excludes);

        (includes, excludes)
    }

    fn collect_includes<'a>(&'a self, includes: &mut Vec<&'a Target>) {
        if self.operator == Operator::Not {
            return;
        }
        for operand in self.operands.iter() {
            match operand {
                Operand::Target(target) => includes.push(target),
                Operand::Criterion(criterion) => criterion.collect_includes(includes),
            }
        }
    }

    /// Remove `target` from the top-level AND of this criterion.
    ///
    /// Returns `Ok(None)` if this criterion is exactly `target`. A single remaining nested
    /// criterion replaces the AND; a single remaining target becomes `OR [target]`.
    pub fn remove_target(&self, target: &Target) -> Result<Option<TargetingCriterion>> {
        let removed = Operand::Target(target.clone());
        if Shape::of_criterion(self) == Shape::of_operand(&removed) {
            return Ok(None);
        }
        if self.operator != Operator::And {
            return Err(Error::InvalidCriterion(format!(
                "expected top-level AND, found {}",
                self.operator
            )));
        }

        let index = self
            .operands
            .iter()
            .position(|operand| *operand == removed)
            .ok_or(Error::TargetNotFound)?;

        let mut remaining = self.operands.to_vec();
        remaining.remove(index);

        Ok(Some(match <[Operand; 1]>::try_from(remaining) {
            Ok([Operand::Criterion(criterion)]) => criterion,
            Ok([Operand::Target(target)]) => Self::from_target(target),
            Err(remaining) => TargetingCriterion {
                operator: Operator::And,
                operands: remaining.into(),
            },
        }))
    }
}

fn dedup(targets: &mut Vec<&Target>) {
    let mut seen: Vec<&Target> = Vec::with_capacity(targets.len());
    targets.retain(|target| {
        if seen.contains(target) {
            false
        } else {
            seen.push(*target);
            true
        }
    });
}

impl From<Target> for TargetingCriterion {
    fn from(target: Target) -> Self {
        Self::from_target(target)
    }
}

impl PartialEq for TargetingCriterion {
    fn eq(&self, other: &Self) -> bool {
        Shape::of_criterion(self) == Shape::of_criterion(other)
    }
}

impl Eq for TargetingCriterion {}

impl std::ops::BitAnd for TargetingCriterion {
    type Output = TargetingCriterion;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.conjunction(&rhs)
    }
}

impl<'a> std::ops::BitAnd<&'a TargetingCriterion> for &'a TargetingCriterion {
    type Output = TargetingCriterion;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.conjunction(rhs)
    }
}

impl std::ops::BitOr for TargetingCriterion {
    type Output = TargetingCriterion;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.disjunction(&rhs)
    }
}

impl<'a> std::ops::BitOr<&'a TargetingCriterion> for &'a TargetingCriterion {
    type Output = TargetingCriterion;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.disjunction(rhs)
    }
}

impl std::ops::Not for TargetingCriterion {
    type Output = TargetingCriterion;

    fn not(self) -> Self::Output {
        self.negation()
    }
}

impl std::ops::Not for &TargetingCriterion {
    type Output = TargetingCriterion;

    fn not(self) -> Self::Output {
        self.negation()
    }
}

/// Normal form used for equality: pass-throughs peeled, same-operator groups merged.
#[derive(Debug)]
enum Shape<'a> {
    Leaf(&'a Target),
    Not(Box<Shape<'a>>),
    Group(Operator, Vec<Shape<'a>>),
}

impl<'a> Shape<'a> {
    fn of_operand(operand: &'a Operand) -> Self {
        match operand {
            Operand::Target(target) => Shape::Leaf(target),
            Operand::Criterion(criterion) => Shape::of_criterion(criterion),
        }
    }

    fn of_criterion(criterion: &'a TargetingCriterion) -> Self {
        match (criterion.operator, &*criterion.operands) {
            (Operator::Not, [operand]) => Shape::Not(Box::new(Shape::of_operand(operand))),
            (_, [operand]) => Shape::of_operand(operand),
            (operator, operands) => {
                let mut members = Vec::with_capacity(operands.len());
                for operand in operands {
                    match Shape::of_operand(operand) {
                        Shape::Group(inner, nested) if inner == operator => members.extend(nested),
                        shape => members.push(shape),
                    }
                }
                Shape::Group(operator, members)
            }
        }
    }
}

impl PartialEq for Shape<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Shape::Leaf(a), Shape::Leaf(b)) => a == b,
            (Shape::Not(a), Shape::Not(b)) => a == b,
            (Shape::Group(op_a, a), Shape::Group(op_b, b)) => {
                op_a == op_b && same_members(a, b)
            }
            _ => false,
        }
    }
}

/// Multiset comparison.
fn same_members(a: &[Shape<'_>], b: &[Shape<'_>]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|member| {
        let found = b
            .iter()
            .enumerate()
            .position(|(i, candidate)| !used[i] && candidate == member);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl Record for TargetingCriterion {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn to_doc(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("operator".to_owned(), Value::from(self.operator.as_str()));
        doc.insert(
            "operands".to_owned(),
            Value::Array(
                self.operands
                    .iter()
                    .map(|operand| Value::Object(operand.to_doc()))
                    .collect(),
            ),
        );
        tag(&mut doc, Self::TYPE_NAME);
        doc
    }

    fn from_doc(doc: &Document) -> Result<Self> {
        expect_type(doc, Self::TYPE_NAME)?;

        let operator = match doc.get("operator") {
            None | Some(Value::Null) => {
                return Err(Error::MissingField {
                    type_name: Self::TYPE_NAME,
                    field: "operator",
                })
            }
            Some(Value::String(s)) => s.parse::<Operator>()?,
            Some(other) => {
                return Err(Error::InvalidCriterion(format!("unknown operator {other}")))
            }
        };

        let operands = match doc.get("operands") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => as_seq(Self::TYPE_NAME, value)?
                .iter()
                .map(|operand| Operand::from_doc(as_doc(Self::TYPE_NAME, operand)?))
                .collect::<Result<Vec<_>>>()?,
        };

        TargetingCriterion::new(operands, operator)
    }
}

impl Serialize for TargetingCriterion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_doc().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TargetingCriterion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let doc = Document::deserialize(deserializer)?;
        TargetingCriterion::from_doc(&doc).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use serde_json::json;

    use super::{Operand, Operator, TargetingCriterion};
    use crate::{
        record::{discriminator, Document, Record},
        AdUnit, Error, Geography, Target,
    };

    fn geo(name: &str) -> Target {
        Geography {
            name: Some(name.into()),
            kind: Some("COUNTRY".into()),
            ..Default::default()
        }
        .into()
    }

    fn unit(id: &str, name: &str) -> Target {
        AdUnit {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Default::default()
        }
        .into()
    }

    fn criterion(targets: &[&Target], operator: Operator) -> TargetingCriterion {
        TargetingCriterion::new(
            targets.iter().map(|t| Operand::from((*t).clone())).collect(),
            operator,
        )
        .unwrap()
    }

    fn names(targets: Vec<&Target>) -> Vec<String> {
        targets
            .into_iter()
            .map(|t| match t {
                Target::Geography(g) => g.name.clone().unwrap(),
                Target::AdUnit(u) => u.name.clone().unwrap(),
                other => panic!("unexpected target {other:?}"),
            })
            .collect()
    }

    #[test]
    fn not_requires_exactly_one_operand() {
        let usa = geo("usa");
        let canada = geo("canada");
        assert!(matches!(
            TargetingCriterion::new(vec![], Operator::Not),
            Err(Error::InvalidCriterion(_))
        ));
        assert!(matches!(
            TargetingCriterion::new(vec![usa.clone().into(), canada.into()], Operator::Not),
            Err(Error::InvalidCriterion(_))
        ));
        assert!(TargetingCriterion::new(vec![usa.into()], Operator::Not).is_ok());
    }

    #[test]
    fn and_or_require_an_operand() {
        for operator in [Operator::And, Operator::Or] {
            assert!(matches!(
                TargetingCriterion::new(vec![], operator),
                Err(Error::InvalidCriterion(_))
            ));
        }
    }

    #[test]
    fn disjunction_of_ors_flattens() {
        let (usa, canada, uk, scotland) = (geo("usa"), geo("canada"), geo("uk"), geo("scotland"));
        let north_america = criterion(&[&usa, &canada], Operator::Or);
        let britain = criterion(&[&uk, &scotland], Operator::Or);

        let combined = &north_america | &britain;

        assert_eq!(combined.operator(), Operator::Or);
        assert_eq!(combined.operands().len(), 4);
        assert_eq!(
            names(combined.flatten()),
            vec!["usa", "canada", "uk", "scotland"]
        );
        // inputs are untouched
        assert_eq!(north_america.operands().len(), 2);
        assert_eq!(britain.operands().len(), 2);
    }

    #[test]
    fn conjunction_nests_other_operators() {
        let (a, b, c, d) = (unit("1", "home"), unit("2", "page"), unit("3", "hockey"), unit("4", "baseball"));
        let left = criterion(&[&a, &b], Operator::Or);
        let right = criterion(&[&c, &d], Operator::Or);

        let combined = left.conjunction(&right);

        assert_eq!(combined.operator(), Operator::And);
        assert_eq!(combined.operands().len(), 2);
        assert!(matches!(&combined.operands()[0], Operand::Criterion(c) if *c == left));
        assert_eq!(combined.flatten().len(), 4);
    }

    #[test]
    fn single_operand_criteria_are_absorbed() {
        let (a, b, c) = (unit("1", "home"), unit("2", "page"), unit("3", "hockey"));
        let combined = TargetingCriterion::from_target(a.clone())
            & TargetingCriterion::from_target(b.clone())
            & TargetingCriterion::from_target(c.clone());

        assert_eq!(combined, criterion(&[&a, &b, &c], Operator::And));
        assert_eq!(combined.operands().len(), 3);
    }

    #[test]
    fn negation_is_not_absorbed() {
        let (a, b) = (unit("1", "home"), unit("2", "page"));
        let excluded = !TargetingCriterion::from_target(b.clone());
        let combined = TargetingCriterion::from_target(a) & excluded.clone();
        assert_eq!(combined.operands().len(), 2);
        assert!(matches!(&combined.operands()[1], Operand::Criterion(c) if *c == excluded));
    }

    #[test]
    fn conjunction_is_associative_under_flattening() {
        let a = criterion(&[&geo("usa"), &geo("canada")], Operator::Or);
        let b = TargetingCriterion::from_target(unit("1", "home"));
        let c = !criterion(&[&unit("2", "page")], Operator::Or);

        let left = (&a & &b) & c.clone();
        let right = &a & &(&b & &c);

        let mut left_names = names(left.flatten());
        let mut right_names = names(right.flatten());
        left_names.sort();
        right_names.sort();
        assert_eq!(left_names, right_names);
        assert_eq!(left, right);
    }

    #[test]
    fn double_negation_is_eliminated() {
        let c = criterion(&[&geo("usa"), &geo("canada")], Operator::Or);
        assert_eq!(c.negation().negation(), c);
        assert_eq!(!!c.clone(), c);

        let leaf = TargetingCriterion::from_target(geo("usa"));
        assert_eq!(leaf.negation().operator(), Operator::Not);
        assert_eq!(!!&leaf, leaf);

        let negated_leaf = TargetingCriterion::new(vec![geo("usa").into()], Operator::Not).unwrap();
        assert_eq!(!!&negated_leaf, negated_leaf);
    }

    #[test]
    fn equality_ignores_and_or_order() {
        let (usa, canada) = (geo("usa"), geo("canada"));
        assert_eq!(
            criterion(&[&usa, &canada], Operator::Or),
            criterion(&[&canada, &usa], Operator::Or)
        );
        assert_ne!(
            criterion(&[&usa, &canada], Operator::Or),
            criterion(&[&usa, &canada], Operator::And)
        );
        assert_ne!(
            criterion(&[&usa, &usa], Operator::Or),
            criterion(&[&usa, &canada], Operator::Or)
        );
    }

    #[test]
    fn flatten_keeps_duplicates_in_order() {
        let (usa, canada) = (geo("usa"), geo("canada"));
        let c = criterion(&[&usa, &canada], Operator::Or) & !criterion(&[&usa], Operator::Or);
        assert_eq!(names(c.flatten()), vec!["usa", "canada", "usa"]);
    }

    #[test]
    fn flatten_descends_into_not() {
        let (a, b) = (unit("1", "home"), unit("2", "page"));
        let inner = criterion(&[&a], Operator::Or) | criterion(&[&b], Operator::Or);
        let c = TargetingCriterion::new(vec![inner.into()], Operator::Not).unwrap();
        assert_eq!(names(c.flatten()), vec!["home", "page"]);
    }

    #[test]
    fn includes_and_excludes() {
        let (a, b, c, d) = (unit("1", "home"), unit("2", "page"), unit("3", "hockey"), unit("4", "baseball"));
        let criterion3 = criterion(&[&a, &b], Operator::Or);
        let criterion5 = criterion(&[&c, &d], Operator::Or);

        let combined = &criterion3 & &!&criterion5;
        let (includes, excludes) = combined.includes_and_excludes();
        assert_eq!(names(includes), vec!["home", "page"]);
        assert_eq!(names(excludes), vec!["hockey", "baseball"]);

        let combined = criterion(&[&a], Operator::Or) & criterion(&[&b], Operator::Or) & criterion5;
        let (includes, excludes) = combined.includes_and_excludes();
        assert_eq!(names(includes), vec!["home", "page", "hockey", "baseball"]);
        assert!(excludes.is_empty());
    }

    #[test]
    fn remove_target_from_top_level_and() {
        let (a, b, c) = (unit("1", "home"), unit("2", "page"), unit("3", "hockey"));
        let all = criterion(&[&a, &b, &c], Operator::And);

        let without_b = all.remove_target(&b).unwrap().unwrap();
        assert_eq!(without_b, criterion(&[&a, &c], Operator::And));

        let only_a = without_b.remove_target(&c).unwrap().unwrap();
        assert_eq!(only_a.operator(), Operator::Or);
        assert_eq!(only_a, TargetingCriterion::from_target(a.clone()));

        assert!(only_a.remove_target(&a).unwrap().is_none());
    }

    #[test]
    fn remove_target_collapses_to_nested_criterion() {
        let (a, b, c) = (unit("1", "home"), unit("2", "page"), unit("3", "hockey"));
        let excluded = !criterion(&[&b, &c], Operator::Or);
        let combined = TargetingCriterion::from_target(a.clone()) & excluded.clone();

        assert_eq!(combined.remove_target(&a).unwrap(), Some(excluded));
    }

    #[test]
    fn remove_target_errors() {
        let (a, b, c) = (unit("1", "home"), unit("2", "page"), unit("3", "hockey"));
        assert!(matches!(
            criterion(&[&a, &b], Operator::Or).remove_target(&a),
            Err(Error::InvalidCriterion(_))
        ));
        assert!(matches!(
            criterion(&[&a, &b], Operator::And).remove_target(&c),
            Err(Error::TargetNotFound)
        ));
    }

    #[test]
    fn document_shape() {
        let (usa, home) = (geo("usa"), unit("1", "home"));
        let c = TargetingCriterion::from_target(usa) & !TargetingCriterion::from_target(home);
        let doc = c.to_doc();

        assert_eq!(discriminator(&doc), Some("TargetingCriterion"));
        assert_eq!(doc["operator"], json!("AND"));
        let operands = doc["operands"].as_array().unwrap();
        assert_eq!(operands[0]["_metadata"]["cls"], json!("Geography"));
        assert_eq!(operands[1]["_metadata"]["cls"], json!("TargetingCriterion"));
        assert_eq!(operands[1]["operator"], json!("NOT"));
        assert_eq!(operands[1]["operands"][0]["_metadata"]["cls"], json!("AdUnit"));
    }

    #[test]
    fn round_trips_through_document() {
        let (a, b, c) = (unit("1", "home"), geo("usa"), geo("canada"));
        let criteria = [
            TargetingCriterion::from_target(a.clone()),
            criterion(&[&b, &c], Operator::Or) & !TargetingCriterion::from_target(a.clone()),
            !(criterion(&[&a], Operator::And) | criterion(&[&b, &c], Operator::And)),
        ];
        for criterion in criteria {
            let doc = criterion.to_doc();
            assert_eq!(TargetingCriterion::from_doc(&doc).unwrap(), criterion);

            let json = serde_json::to_string(&criterion).unwrap();
            let parsed: TargetingCriterion = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, criterion);
        }
    }

    #[test]
    fn reordered_document_is_equal() {
        let doc: Document = serde_json::from_value(json!({
            "operator": "OR",
            "operands": [
                {"name": "canada", "type": "COUNTRY", "_metadata": {"cls": "Geography"}},
                {"name": "usa", "type": "COUNTRY", "_metadata": {"cls": "Geography"}}
            ],
            "_metadata": {"cls": "TargetingCriterion"}
        }))
        .unwrap();
        assert_eq!(
            TargetingCriterion::from_doc(&doc).unwrap(),
            criterion(&[&geo("usa"), &geo("canada")], Operator::Or)
        );
    }

    #[test]
    fn missing_operator_is_an_error() {
        let doc: Document = serde_json::from_value(json!({"operands": []})).unwrap();
        assert!(matches!(
            TargetingCriterion::from_doc(&doc),
            Err(Error::MissingField {
                field: "operator",
                ..
            })
        ));
    }

    #[test]
    fn missing_operands_fail_arity_check() {
        let doc: Document = serde_json::from_value(json!({"operator": "AND"})).unwrap();
        assert!(matches!(
            TargetingCriterion::from_doc(&doc),
            Err(Error::InvalidCriterion(_))
        ));
    }

    #[test]
    fn unknown_operand_type_fails() {
        let doc: Document = serde_json::from_value(json!({
            "operator": "OR",
            "operands": [{"_metadata": {"cls": "Audience"}}]
        }))
        .unwrap();
        assert!(matches!(
            TargetingCriterion::from_doc(&doc),
            Err(Error::UnknownType(ref name)) if name == "Audience"
        ));
    }

    #[test]
    fn unknown_operator_fails() {
        let doc: Document = serde_json::from_value(json!({"operator": "XOR", "operands": []})).unwrap();
        assert!(matches!(
            TargetingCriterion::from_doc(&doc),
            Err(Error::InvalidCriterion(_))
        ));
    }

    #[test]
    fn criteria_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TargetingCriterion>();

        let c = TargetingCriterion::from_target(geo("usa"));
        let handle = {
            let c = c.clone();
            std::thread::spawn(move || c.flatten().len())
        };
        assert_eq!(handle.join().unwrap(), 1);
        assert_eq!(c.flatten().len(), 1);
    }

    #[test]
    fn reads_fixture() {
        let f = File::open("tests/data/criterion.json")
            .expect("Failed to open tests/data/criterion.json");
        let doc: Document = serde_json::from_reader(f).unwrap();
        let c = TargetingCriterion::from_doc(&doc).unwrap();

        assert_eq!(c.operator(), Operator::And);
        assert_eq!(c.operands().len(), 3);
        assert_eq!(c.flatten().len(), 4);

        let (includes, excludes) = c.includes_and_excludes();
        assert_eq!(includes.len(), 3);
        assert_eq!(names(excludes), vec!["Sports/Hockey"]);

        assert_eq!(TargetingCriterion::from_doc(&c.to_doc()).unwrap(), c);
    }
}
