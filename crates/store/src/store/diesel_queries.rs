//! Provides the diesel queries, callers should handle connection pooling and
//! transactions.
//!
//! `where` inputs are translated into boxed boolean expressions. A
//! [`Condition`] of `None` stands for a filter that every row satisfies, so
//! that no SQL is emitted for it.

use async_graphql::MaybeUndefined;
use chrono::{DateTime, Utc};
use diesel::dsl::{count, count_star, max, min, not, sum};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Nullable};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use itertools::Itertools;
use phrasebook_common_types::filters::{
    DateTimeFilter, IntFilter, IntNullableFilter, StringFilter,
};
use phrasebook_common_types::inputs::{
    CommentFindMany, CommentOrderByInput, CommentScalarFieldEnum, CommentWhereInput,
    FindManyArgs, PhraseFindMany, PhraseOrderByInput, PhraseScalarFieldEnum, PhraseWhereInput,
};
use phrasebook_common_types::{SortOrder, Window};

use super::StoreError;
use crate::models::{
    self, average, AggregateCount, Comment, CommentAggregate, CommentAvgAggregate,
    CommentScalarAggregate, CommentSumAggregate, Phrase, PhraseAggregate, PhraseAvgAggregate,
    PhraseScalarAggregate, PhraseSumAggregate,
};
use crate::schema::{comments, phrases};

pub(crate) type BoxedCondition<T> = Box<dyn BoxableExpression<T, Pg, SqlType = Nullable<Bool>>>;
pub(crate) type Condition<T> = Option<BoxedCondition<T>>;

/// Tables that `where` inputs can be applied to.
pub(crate) trait Filterable: Table + Sized + 'static {
    /// A condition that no row satisfies.
    fn nothing() -> BoxedCondition<Self>;
    /// A condition that every row satisfies.
    fn everything() -> BoxedCondition<Self>;
}

// `id` is the primary key, it's never NULL.
impl Filterable for comments::table {
    fn nothing() -> BoxedCondition<Self> {
        Box::new(comments::id.is_null().nullable())
    }

    fn everything() -> BoxedCondition<Self> {
        Box::new(comments::id.is_not_null().nullable())
    }
}

impl Filterable for phrases::table {
    fn nothing() -> BoxedCondition<Self> {
        Box::new(phrases::id.is_null().nullable())
    }

    fn everything() -> BoxedCondition<Self> {
        Box::new(phrases::id.is_not_null().nullable())
    }
}

fn and_all<T: Filterable>(conditions: impl IntoIterator<Item = Condition<T>>) -> Condition<T> {
    conditions
        .into_iter()
        .flatten()
        .reduce(|a, b| -> BoxedCondition<T> { Box::new(a.and(b)) })
}

fn or_any<T: Filterable>(conditions: impl IntoIterator<Item = Condition<T>>) -> Condition<T> {
    let mut disjuncts = vec![];
    for condition in conditions {
        match condition {
            Some(condition) => disjuncts.push(condition),
            // One unconstrained branch makes the whole disjunction true.
            None => return None,
        }
    }

    Some(
        disjuncts
            .into_iter()
            .reduce(|a, b| -> BoxedCondition<T> { Box::new(a.or(b)) })
            .unwrap_or_else(T::nothing),
    )
}

fn negate<T: Filterable>(condition: Condition<T>) -> Condition<T> {
    match condition {
        Some(condition) => Some(Box::new(not(condition).nullable())),
        None => Some(T::nothing()),
    }
}

/// Escapes `LIKE` wildcards, so that user input only ever matches literally.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Pushes the comparisons that all scalar filters share.
macro_rules! push_comparisons {
    ($conditions:ident, $column:expr, $filter:expr) => {
        if let Some(values) = $filter.in_.clone() {
            $conditions.push(Some(Box::new($column.eq_any(values).nullable())));
        }
        if let Some(values) = $filter.not_in.clone() {
            $conditions.push(Some(Box::new($column.ne_all(values).nullable())));
        }
        if let Some(value) = $filter.lt.clone() {
            $conditions.push(Some(Box::new($column.lt(value).nullable())));
        }
        if let Some(value) = $filter.lte.clone() {
            $conditions.push(Some(Box::new($column.le(value).nullable())));
        }
        if let Some(value) = $filter.gt.clone() {
            $conditions.push(Some(Box::new($column.gt(value).nullable())));
        }
        if let Some(value) = $filter.gte.clone() {
            $conditions.push(Some(Box::new($column.ge(value).nullable())));
        }
    };
}

/// Defines a function that translates an [`IntFilter`] or a
/// [`DateTimeFilter`] on a non-nullable column.
macro_rules! scalar_filter_fn {
    ($fn_name:ident, $filter_ty:ty, $table:ident :: $column:ident) => {
        fn $fn_name(filter: &$filter_ty) -> Condition<$table::table> {
            let mut conditions: Vec<Condition<$table::table>> = vec![];
            if let Some(value) = filter.equals.clone() {
                conditions.push(Some(Box::new($table::$column.eq(value).nullable())));
            }
            push_comparisons!(conditions, $table::$column, filter);
            if let Some(inner) = &filter.not {
                conditions.push(negate($fn_name(inner)));
            }
            and_all(conditions)
        }
    };
}

/// Like [`scalar_filter_fn`], for [`IntNullableFilter`]s. Negations follow
/// SQL's three-valued logic: `not: { equals: 1 }` doesn't match `NULL`s.
macro_rules! nullable_filter_fn {
    ($fn_name:ident, $table:ident :: $column:ident) => {
        fn $fn_name(filter: &IntNullableFilter) -> Condition<$table::table> {
            let mut conditions: Vec<Condition<$table::table>> = vec![];
            match filter.equals {
                MaybeUndefined::Undefined => {}
                MaybeUndefined::Null => {
                    conditions.push(Some(Box::new($table::$column.is_null().nullable())));
                }
                MaybeUndefined::Value(value) => {
                    conditions.push(Some(Box::new($table::$column.eq(value).nullable())));
                }
            }
            push_comparisons!(conditions, $table::$column, filter);
            if let Some(inner) = &filter.not {
                conditions.push(negate($fn_name(inner)));
            }
            and_all(conditions)
        }
    };
}

/// Defines a function that translates a [`StringFilter`]. A nested `not`
/// inherits the case sensitivity of its parent unless it sets its own `mode`.
macro_rules! string_filter_fn {
    ($fn_name:ident, $table:ident :: $column:ident) => {
        fn $fn_name(filter: &StringFilter, inherit_insensitive: bool) -> Condition<$table::table> {
            let insensitive = filter.mode.map_or(inherit_insensitive, |_| {
                filter.is_insensitive()
            });
            let matching = |pattern: String| -> Condition<$table::table> {
                if insensitive {
                    Some(Box::new($table::$column.ilike(pattern).nullable()))
                } else {
                    Some(Box::new($table::$column.like(pattern).nullable()))
                }
            };

            let mut conditions: Vec<Condition<$table::table>> = vec![];
            match &filter.equals {
                Some(value) if insensitive => conditions.push(matching(escape_like(value))),
                Some(value) => {
                    conditions.push(Some(Box::new($table::$column.eq(value.clone()).nullable())))
                }
                None => {}
            }
            push_comparisons!(conditions, $table::$column, filter);
            if let Some(value) = &filter.contains {
                conditions.push(matching(format!("%{}%", escape_like(value))));
            }
            if let Some(value) = &filter.starts_with {
                conditions.push(matching(format!("{}%", escape_like(value))));
            }
            if let Some(value) = &filter.ends_with {
                conditions.push(matching(format!("%{}", escape_like(value))));
            }
            if let Some(inner) = &filter.not {
                conditions.push(negate($fn_name(inner, insensitive)));
            }
            and_all(conditions)
        }
    };
}

scalar_filter_fn!(comment_id_filter, IntFilter, comments::id);
scalar_filter_fn!(comment_create_at_filter, DateTimeFilter, comments::create_at);
string_filter_fn!(comment_content_filter, comments::content);
nullable_filter_fn!(comment_phrase_id_filter, comments::phrase_id);
nullable_filter_fn!(comment_comment_id_filter, comments::comment_id);

scalar_filter_fn!(phrase_id_filter, IntFilter, phrases::id);
scalar_filter_fn!(phrase_create_at_filter, DateTimeFilter, phrases::create_at);
string_filter_fn!(phrase_content_filter, phrases::content);

pub(crate) fn comment_condition(filter: &CommentWhereInput) -> Condition<comments::table> {
    and_all([
        filter
            .and
            .as_ref()
            .and_then(|filters| and_all(filters.iter().map(comment_condition))),
        filter
            .or
            .as_ref()
            .and_then(|filters| or_any(filters.iter().map(comment_condition))),
        filter.not.as_ref().and_then(|filters| {
            and_all(filters.iter().map(|f| negate(comment_condition(f))))
        }),
        filter.id.as_ref().and_then(comment_id_filter),
        filter.create_at.as_ref().and_then(comment_create_at_filter),
        filter
            .content
            .as_ref()
            .and_then(|f| comment_content_filter(f, false)),
        filter.phrase_id.as_ref().and_then(comment_phrase_id_filter),
        filter.comment_id.as_ref().and_then(comment_comment_id_filter),
    ])
}

pub(crate) fn phrase_condition(filter: &PhraseWhereInput) -> Condition<phrases::table> {
    and_all([
        filter
            .and
            .as_ref()
            .and_then(|filters| and_all(filters.iter().map(phrase_condition))),
        filter
            .or
            .as_ref()
            .and_then(|filters| or_any(filters.iter().map(phrase_condition))),
        filter.not.as_ref().and_then(|filters| {
            and_all(filters.iter().map(|f| negate(phrase_condition(f))))
        }),
        filter.id.as_ref().and_then(phrase_id_filter),
        filter.create_at.as_ref().and_then(phrase_create_at_filter),
        filter
            .content
            .as_ref()
            .and_then(|f| phrase_content_filter(f, false)),
    ])
}

// Ordering
// --------

/// Flattens `orderBy` entries into a list of sort keys, always ending with
/// `id` so that the ordering is total.
pub(crate) fn comment_sort_keys(
    order_by: &[CommentOrderByInput],
) -> Vec<(CommentScalarFieldEnum, SortOrder)> {
    use CommentScalarFieldEnum as F;

    let mut keys = vec![];
    for entry in order_by {
        let fields = [
            (F::Id, entry.id),
            (F::CreateAt, entry.create_at),
            (F::Content, entry.content),
            (F::PhraseId, entry.phrase_id),
            (F::CommentId, entry.comment_id),
        ];
        for (field, order) in fields {
            if let Some(order) = order {
                keys.push((field, order));
            }
        }
    }
    finish_sort_keys(keys, F::Id)
}

pub(crate) fn phrase_sort_keys(
    order_by: &[PhraseOrderByInput],
) -> Vec<(PhraseScalarFieldEnum, SortOrder)> {
    use PhraseScalarFieldEnum as F;

    let mut keys = vec![];
    for entry in order_by {
        let fields = [
            (F::Id, entry.id),
            (F::CreateAt, entry.create_at),
            (F::Content, entry.content),
        ];
        for (field, order) in fields {
            if let Some(order) = order {
                keys.push((field, order));
            }
        }
    }
    finish_sort_keys(keys, F::Id)
}

fn finish_sort_keys<F: Copy + Eq + std::hash::Hash>(
    keys: Vec<(F, SortOrder)>,
    id: F,
) -> Vec<(F, SortOrder)> {
    // Later duplicates can't change the ordering anymore.
    let mut keys: Vec<_> = keys.into_iter().unique_by(|(field, _)| *field).collect();
    // Anything after `id` is dead weight, it's unique.
    if let Some(position) = keys.iter().position(|(field, _)| *field == id) {
        keys.truncate(position + 1);
    } else {
        keys.push((id, SortOrder::Asc));
    }
    keys
}

fn reversed<F: Copy>(keys: &[(F, SortOrder)]) -> Vec<(F, SortOrder)> {
    keys.iter()
        .map(|&(field, order)| (field, order.reversed()))
        .collect()
}

macro_rules! then_order_by {
    ($query:expr, $column:expr, $order:expr) => {
        match $order {
            SortOrder::Asc => $query.then_order_by($column.asc()),
            SortOrder::Desc => $query.then_order_by($column.desc()),
        }
    };
}

fn order_comments(
    mut query: comments::BoxedQuery<'static, Pg>,
    keys: &[(CommentScalarFieldEnum, SortOrder)],
) -> comments::BoxedQuery<'static, Pg> {
    use CommentScalarFieldEnum as F;

    for &(field, order) in keys {
        query = match field {
            F::Id => then_order_by!(query, comments::id, order),
            F::CreateAt => then_order_by!(query, comments::create_at, order),
            F::Content => then_order_by!(query, comments::content, order),
            F::PhraseId => then_order_by!(query, comments::phrase_id, order),
            F::CommentId => then_order_by!(query, comments::comment_id, order),
        };
    }
    query
}

fn order_phrases(
    mut query: phrases::BoxedQuery<'static, Pg>,
    keys: &[(PhraseScalarFieldEnum, SortOrder)],
) -> phrases::BoxedQuery<'static, Pg> {
    use PhraseScalarFieldEnum as F;

    for &(field, order) in keys {
        query = match field {
            F::Id => then_order_by!(query, phrases::id, order),
            F::CreateAt => then_order_by!(query, phrases::create_at, order),
            F::Content => then_order_by!(query, phrases::content, order),
        };
    }
    query
}

// Cursors
// -------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Equal,
    After,
    AtOrAfter,
}

macro_rules! compare {
    ($table:ident :: $column:ident, $cmp:expr, $order:expr, $value:expr) => {{
        let condition: BoxedCondition<$table::table> = match ($cmp, $order) {
            (Cmp::Equal, _) => Box::new($table::$column.eq($value).nullable()),
            (Cmp::After, SortOrder::Asc) => Box::new($table::$column.gt($value).nullable()),
            (Cmp::After, SortOrder::Desc) => Box::new($table::$column.lt($value).nullable()),
            (Cmp::AtOrAfter, SortOrder::Asc) => Box::new($table::$column.ge($value).nullable()),
            (Cmp::AtOrAfter, SortOrder::Desc) => Box::new($table::$column.le($value).nullable()),
        };
        condition
    }};
}

/// Builds the lexicographic "at or after the cursor row" condition for the
/// given sort keys, which must end with the unique `id`.
fn cursor_condition<F: Copy, T: Filterable>(
    keys: &[(F, SortOrder)],
    key_condition: impl Fn(F, SortOrder, Cmp) -> BoxedCondition<T>,
) -> Condition<T> {
    let last = keys.len().saturating_sub(1);
    let branches = (0..keys.len()).map(|i| {
        let (field, order) = keys[i];
        let cmp = if i == last { Cmp::AtOrAfter } else { Cmp::After };
        and_all(
            keys[..i]
                .iter()
                .map(|&(prefix, order)| Some(key_condition(prefix, order, Cmp::Equal)))
                .chain([Some(key_condition(field, order, cmp))]),
        )
    });
    or_any(branches.collect::<Vec<_>>())
}

fn comment_cursor_condition(
    keys: &[(CommentScalarFieldEnum, SortOrder)],
    cursor: &Comment,
) -> Result<Condition<comments::table>, StoreError> {
    use CommentScalarFieldEnum as F;

    if let Some((field, _)) = keys
        .iter()
        .find(|(field, _)| matches!(field, F::PhraseId | F::CommentId))
    {
        return Err(StoreError::UnsupportedCursorOrdering(format!("{field:?}")));
    }

    Ok(cursor_condition(keys, |field, order, cmp| match field {
        F::Id => compare!(comments::id, cmp, order, cursor.id),
        F::CreateAt => compare!(comments::create_at, cmp, order, cursor.create_at),
        F::Content => compare!(comments::content, cmp, order, cursor.content.clone()),
        // Rejected above.
        F::PhraseId | F::CommentId => comments::table::nothing(),
    }))
}

fn phrase_cursor_condition(
    keys: &[(PhraseScalarFieldEnum, SortOrder)],
    cursor: &Phrase,
) -> Condition<phrases::table> {
    use PhraseScalarFieldEnum as F;

    cursor_condition(keys, |field, order, cmp| match field {
        F::Id => compare!(phrases::id, cmp, order, cursor.id),
        F::CreateAt => compare!(phrases::create_at, cmp, order, cursor.create_at),
        F::Content => compare!(phrases::content, cmp, order, cursor.content.clone()),
    })
}

// Distinct
// --------

/// A column value, used to de-duplicate rows on `distinct` fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ScalarValue {
    Int(Option<i32>),
    DateTime(DateTime<Utc>),
    Text(String),
}

pub(crate) fn comment_distinct_key(
    comment: &Comment,
    fields: &[CommentScalarFieldEnum],
) -> Vec<ScalarValue> {
    use CommentScalarFieldEnum as F;

    fields
        .iter()
        .map(|field| match field {
            F::Id => ScalarValue::Int(Some(comment.id)),
            F::CreateAt => ScalarValue::DateTime(comment.create_at),
            F::Content => ScalarValue::Text(comment.content.clone()),
            F::PhraseId => ScalarValue::Int(comment.phrase_id),
            F::CommentId => ScalarValue::Int(comment.comment_id),
        })
        .collect()
}

pub(crate) fn phrase_distinct_key(
    phrase: &Phrase,
    fields: &[PhraseScalarFieldEnum],
) -> Vec<ScalarValue> {
    use PhraseScalarFieldEnum as F;

    fields
        .iter()
        .map(|field| match field {
            F::Id => ScalarValue::Int(Some(phrase.id)),
            F::CreateAt => ScalarValue::DateTime(phrase.create_at),
            F::Content => ScalarValue::Text(phrase.content.clone()),
        })
        .collect()
}

// Queries
// -------

pub(super) async fn comments(
    conn: &mut AsyncPgConnection,
    args: &CommentFindMany,
) -> anyhow::Result<Vec<Comment>> {
    let window = Window::new(args.take, args.skip)?;
    let mut keys = comment_sort_keys(&args.order_by);
    if window.backwards {
        keys = reversed(&keys);
    }

    let mut query = comments::table.into_boxed();
    if let Some(condition) = args.filter.as_ref().and_then(comment_condition) {
        query = query.filter(condition);
    }
    if let Some(cursor) = args.cursor {
        let Some(cursor) = comments::table
            .find(cursor)
            .first::<Comment>(conn)
            .await
            .optional()?
        else {
            return Ok(vec![]);
        };
        if let Some(condition) = comment_cursor_condition(&keys, &cursor)? {
            query = query.filter(condition);
        }
    }
    query = order_comments(query, &keys);

    if args.distinct.is_empty() {
        if let Some(limit) = window.limit() {
            query = query.limit(limit);
        }
        let mut rows = query
            .offset(window.offset())
            .load::<Comment>(conn)
            .await?;
        window.restore_order(&mut rows);
        Ok(rows)
    } else {
        let rows = query.load::<Comment>(conn).await?;
        Ok(window.apply(
            rows.into_iter()
                .unique_by(|row| comment_distinct_key(row, &args.distinct)),
        ))
    }
}

pub(super) async fn phrases(
    conn: &mut AsyncPgConnection,
    args: &PhraseFindMany,
) -> anyhow::Result<Vec<Phrase>> {
    let window = Window::new(args.take, args.skip)?;
    let mut keys = phrase_sort_keys(&args.order_by);
    if window.backwards {
        keys = reversed(&keys);
    }

    let mut query = phrases::table.into_boxed();
    if let Some(condition) = args.filter.as_ref().and_then(phrase_condition) {
        query = query.filter(condition);
    }
    if let Some(cursor) = args.cursor {
        let Some(cursor) = phrases::table
            .find(cursor)
            .first::<Phrase>(conn)
            .await
            .optional()?
        else {
            return Ok(vec![]);
        };
        if let Some(condition) = phrase_cursor_condition(&keys, &cursor) {
            query = query.filter(condition);
        }
    }
    query = order_phrases(query, &keys);

    if args.distinct.is_empty() {
        if let Some(limit) = window.limit() {
            query = query.limit(limit);
        }
        let mut rows = query
            .offset(window.offset())
            .load::<Phrase>(conn)
            .await?;
        window.restore_order(&mut rows);
        Ok(rows)
    } else {
        let rows = query.load::<Phrase>(conn).await?;
        Ok(window.apply(
            rows.into_iter()
                .unique_by(|row| phrase_distinct_key(row, &args.distinct)),
        ))
    }
}

fn needs_window<W, O, F>(args: &FindManyArgs<W, O, F>) -> bool {
    !args.distinct.is_empty() || args.cursor.is_some() || args.take.is_some() || args.skip.is_some()
}

pub(super) async fn count_comments(
    conn: &mut AsyncPgConnection,
    args: &CommentFindMany,
) -> anyhow::Result<i64> {
    if needs_window(args) {
        return Ok(comments(conn, args).await?.len() as i64);
    }

    let mut query = comments::table.into_boxed();
    if let Some(condition) = args.filter.as_ref().and_then(comment_condition) {
        query = query.filter(condition);
    }
    Ok(query.count().get_result::<i64>(conn).await?)
}

pub(super) async fn count_phrases(
    conn: &mut AsyncPgConnection,
    args: &PhraseFindMany,
) -> anyhow::Result<i64> {
    if needs_window(args) {
        return Ok(phrases(conn, args).await?.len() as i64);
    }

    let mut query = phrases::table.into_boxed();
    if let Some(condition) = args.filter.as_ref().and_then(phrase_condition) {
        query = query.filter(condition);
    }
    Ok(query.count().get_result::<i64>(conn).await?)
}

type CommentAggregateRow = (
    i64,
    Option<i32>,
    Option<i32>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<String>,
    Option<String>,
    Option<i32>,
    Option<i32>,
    Option<i32>,
    Option<i32>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    i64,
    i64,
);

// This is a single SQL statement, a transaction is not necessary.
pub(super) async fn aggregate_comments(
    conn: &mut AsyncPgConnection,
    filter: Option<&CommentWhereInput>,
) -> anyhow::Result<CommentAggregate> {
    let mut query = comments::table.into_boxed();
    if let Some(condition) = filter.and_then(comment_condition) {
        query = query.filter(condition);
    }

    let (
        count_all,
        min_id,
        max_id,
        min_create_at,
        max_create_at,
        min_content,
        max_content,
        min_phrase_id,
        max_phrase_id,
        min_comment_id,
        max_comment_id,
        sum_id,
        sum_phrase_id,
        sum_comment_id,
        count_phrase_id,
        count_comment_id,
    ) = query
        .select((
            count_star(),
            min(comments::id),
            max(comments::id),
            min(comments::create_at),
            max(comments::create_at),
            min(comments::content),
            max(comments::content),
            min(comments::phrase_id),
            max(comments::phrase_id),
            min(comments::comment_id),
            max(comments::comment_id),
            sum(comments::id),
            sum(comments::phrase_id),
            sum(comments::comment_id),
            count(comments::phrase_id),
            count(comments::comment_id),
        ))
        .get_result::<CommentAggregateRow>(conn)
        .await?;

    Ok(CommentAggregate {
        count: AggregateCount { all: count_all },
        avg: CommentAvgAggregate {
            id: average(sum_id, count_all),
            phrase_id: average(sum_phrase_id, count_phrase_id),
            comment_id: average(sum_comment_id, count_comment_id),
        },
        sum: CommentSumAggregate {
            id: sum_id,
            phrase_id: sum_phrase_id,
            comment_id: sum_comment_id,
        },
        min: CommentScalarAggregate {
            id: min_id,
            create_at: min_create_at,
            content: min_content,
            phrase_id: min_phrase_id,
            comment_id: min_comment_id,
        },
        max: CommentScalarAggregate {
            id: max_id,
            create_at: max_create_at,
            content: max_content,
            phrase_id: max_phrase_id,
            comment_id: max_comment_id,
        },
    })
}

pub(super) async fn aggregate_phrases(
    conn: &mut AsyncPgConnection,
    filter: Option<&PhraseWhereInput>,
) -> anyhow::Result<PhraseAggregate> {
    let mut query = phrases::table.into_boxed();
    if let Some(condition) = filter.and_then(phrase_condition) {
        query = query.filter(condition);
    }

    let (count_all, min_id, max_id, min_create_at, max_create_at, min_content, max_content, sum_id) =
        query
            .select((
                count_star(),
                min(phrases::id),
                max(phrases::id),
                min(phrases::create_at),
                max(phrases::create_at),
                min(phrases::content),
                max(phrases::content),
                sum(phrases::id),
            ))
            .get_result::<(
                i64,
                Option<i32>,
                Option<i32>,
                Option<DateTime<Utc>>,
                Option<DateTime<Utc>>,
                Option<String>,
                Option<String>,
                Option<i64>,
            )>(conn)
            .await?;

    Ok(PhraseAggregate {
        count: AggregateCount { all: count_all },
        avg: PhraseAvgAggregate {
            id: average(sum_id, count_all),
        },
        sum: PhraseSumAggregate { id: sum_id },
        min: PhraseScalarAggregate {
            id: min_id,
            create_at: min_create_at,
            content: min_content,
        },
        max: PhraseScalarAggregate {
            id: max_id,
            create_at: max_create_at,
            content: max_content,
        },
    })
}

pub(super) async fn update_comments(
    conn: &mut AsyncPgConnection,
    filter: Option<&CommentWhereInput>,
    changeset: &models::CommentChangeset,
) -> anyhow::Result<Vec<Comment>> {
    let condition = filter
        .and_then(comment_condition)
        .unwrap_or_else(comments::table::everything);

    if changeset.is_empty() {
        return Ok(comments::table
            .filter(condition)
            .order_by(comments::id.asc())
            .load::<Comment>(conn)
            .await?);
    }

    Ok(diesel::update(comments::table)
        .filter(condition)
        .set(changeset)
        .get_results::<Comment>(conn)
        .await?)
}

pub(super) async fn update_phrases(
    conn: &mut AsyncPgConnection,
    filter: Option<&PhraseWhereInput>,
    changeset: &models::PhraseChangeset,
) -> anyhow::Result<Vec<Phrase>> {
    let condition = filter
        .and_then(phrase_condition)
        .unwrap_or_else(phrases::table::everything);

    if changeset.is_empty() {
        return Ok(phrases::table
            .filter(condition)
            .order_by(phrases::id.asc())
            .load::<Phrase>(conn)
            .await?);
    }

    Ok(diesel::update(phrases::table)
        .filter(condition)
        .set(changeset)
        .get_results::<Phrase>(conn)
        .await?)
}

pub(super) async fn delete_comments(
    conn: &mut AsyncPgConnection,
    filter: Option<&CommentWhereInput>,
) -> anyhow::Result<Vec<Comment>> {
    let condition = filter
        .and_then(comment_condition)
        .unwrap_or_else(comments::table::everything);

    Ok(diesel::delete(comments::table.filter(condition))
        .get_results::<Comment>(conn)
        .await?)
}

pub(super) async fn delete_phrases(
    conn: &mut AsyncPgConnection,
    filter: Option<&PhraseWhereInput>,
) -> anyhow::Result<Vec<Phrase>> {
    let condition = filter
        .and_then(phrase_condition)
        .unwrap_or_else(phrases::table::everything);

    Ok(diesel::delete(phrases::table.filter(condition))
        .get_results::<Phrase>(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use diesel::debug_query;
    use phrasebook_common_types::QueryMode;

    use super::*;

    fn comment_sql(filter: &CommentWhereInput) -> String {
        let query = comments::table
            .select(comments::id)
            .filter(comment_condition(filter).unwrap_or_else(comments::table::nothing));
        debug_query::<Pg, _>(&query).to_string()
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn empty_filter_has_no_condition() {
        assert!(comment_condition(&CommentWhereInput::default()).is_none());
        assert!(phrase_condition(&PhraseWhereInput::default()).is_none());
    }

    #[test]
    fn empty_or_matches_nothing() {
        let filter = CommentWhereInput {
            or: Some(vec![]),
            ..Default::default()
        };
        assert!(comment_sql(&filter).contains("IS NULL"));
    }

    #[test]
    fn insensitive_contains_uses_ilike() {
        let filter = PhraseWhereInput {
            content: Some(StringFilter {
                contains: Some("Hi%".to_string()),
                mode: Some(QueryMode::Insensitive),
                ..Default::default()
            }),
            ..Default::default()
        };
        let query = phrases::table
            .select(phrases::id)
            .filter(phrase_condition(&filter).unwrap_or_else(phrases::table::nothing));
        let sql = debug_query::<Pg, _>(&query).to_string();

        assert!(sql.contains("ILIKE"), "{sql}");
        assert!(sql.contains("%Hi\\\\%%") || sql.contains("%Hi\\%%"), "{sql}");
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let sql = comment_sql(&CommentWhereInput::replies_to(1).combined_with(
            CommentWhereInput {
                phrase_id: Some(IntNullableFilter::equals(None)),
                ..Default::default()
            },
        ));

        assert!(sql.contains("\"comments\".\"comment_id\" = $1"), "{sql}");
        assert!(sql.contains("\"comments\".\"phrase_id\" IS NULL"), "{sql}");
    }

    #[test]
    fn sort_keys_end_with_id() {
        let keys = comment_sort_keys(&[CommentOrderByInput {
            content: Some(SortOrder::Desc),
            ..Default::default()
        }]);
        assert_eq!(
            keys,
            vec![
                (CommentScalarFieldEnum::Content, SortOrder::Desc),
                (CommentScalarFieldEnum::Id, SortOrder::Asc),
            ]
        );

        let keys = phrase_sort_keys(&[
            PhraseOrderByInput {
                id: Some(SortOrder::Desc),
                ..Default::default()
            },
            PhraseOrderByInput {
                content: Some(SortOrder::Asc),
                ..Default::default()
            },
        ]);
        assert_eq!(keys, vec![(PhraseScalarFieldEnum::Id, SortOrder::Desc)]);
    }

    #[test]
    fn cursor_on_nullable_ordering_is_rejected() {
        let keys = comment_sort_keys(&[CommentOrderByInput {
            phrase_id: Some(SortOrder::Asc),
            ..Default::default()
        }]);
        let cursor = Comment {
            id: 1,
            create_at: Utc::now(),
            content: String::new(),
            phrase_id: None,
            comment_id: None,
        };

        assert!(matches!(
            comment_cursor_condition(&keys, &cursor),
            Err(StoreError::UnsupportedCursorOrdering(_))
        ));
    }

    #[test]
    fn distinct_keys_follow_field_order() {
        let comment = Comment {
            id: 7,
            create_at: Utc::now(),
            content: "hello".to_string(),
            phrase_id: Some(2),
            comment_id: None,
        };

        assert_eq!(
            comment_distinct_key(
                &comment,
                &[CommentScalarFieldEnum::CommentId, CommentScalarFieldEnum::Content]
            ),
            vec![ScalarValue::Int(None), ScalarValue::Text("hello".to_string())]
        );
    }
}
