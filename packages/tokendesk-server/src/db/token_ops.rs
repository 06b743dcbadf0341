use crate::admin::changelist::{ChangeListQuery, DateFilter};
use crate::admin::config::{ApiTokenAdmin, ModelAdmin};
use crate::db::api_tokens::{self, Entity as ApiTokens, Model as TokenModel};
use crate::db::users::{self, Model as UserModel};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

const LIKE_ESCAPE: char = '\\';

/// 一页 changelist 结果
#[derive(Debug, Clone)]
pub(crate) struct TokenPage {
    pub rows: Vec<(TokenModel, Option<UserModel>)>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub num_pages: u64,
}

/// `%term%`, with `%` and `_` in the term matched literally
fn contains_pattern(term: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape(LIKE_ESCAPE)
}

fn search_condition(field: &str, term: &str) -> Option<Condition> {
    let condition = Condition::all();
    let pattern = contains_pattern(term);
    match field {
        "user__username" => Some(condition.add(users::Column::Username.like(pattern))),
        "user__email" => Some(condition.add(users::Column::Email.like(pattern))),
        "name" => Some(condition.add(api_tokens::Column::Name.like(pattern))),
        _ => None,
    }
}

fn date_condition(column: api_tokens::Column, filter: DateFilter, now: DateTime<Utc>) -> Condition {
    match filter {
        DateFilter::NoDate => Condition::all().add(column.is_null()),
        DateFilter::HasDate => Condition::all().add(column.is_not_null()),
        bounded => match bounded.range(now) {
            Some((start, end)) => Condition::all().add(column.gte(start)).add(column.lt(end)),
            None => Condition::all(),
        },
    }
}

/// changelist 的查询条件: 每个搜索词都要命中 (AND), 任一搜索字段命中即可 (OR)
pub(crate) fn changelist_condition(query: &ChangeListQuery, now: DateTime<Utc>) -> Condition {
    let admin = ApiTokenAdmin;
    let mut condition = Condition::all();

    for term in query.search_terms() {
        let any_field = admin
            .search_fields()
            .iter()
            .filter_map(|field| search_condition(field, term))
            .fold(Condition::any(), |any, field| any.add(field));
        condition = condition.add(any_field);
    }

    if let Some(active) = query.active_filter() {
        condition = condition.add(api_tokens::Column::IsActive.eq(active));
    }
    if let Some(filter) = query.expires_filter() {
        condition = condition.add(date_condition(api_tokens::Column::ExpiresAt, filter, now));
    }
    if let Some(filter) = query.created_filter() {
        condition = condition.add(date_condition(api_tokens::Column::CreatedAt, filter, now));
    }

    condition
}

pub async fn list_tokens(
    db: &DatabaseConnection,
    query: &ChangeListQuery,
    now: DateTime<Utc>,
) -> Result<TokenPage, AppError> {
    let admin = ApiTokenAdmin;
    let ordering = query.ordering();
    let order = if ordering.descending {
        Order::Desc
    } else {
        Order::Asc
    };

    let select = ApiTokens::find()
        .find_also_related(users::Entity)
        .filter(changelist_condition(query, now));

    let select = match ordering.field {
        "user" => select.order_by(users::Column::Username, order),
        "name" => select.order_by(api_tokens::Column::Name, order),
        "token_length" => select.order_by(api_tokens::Column::TokenLength, order),
        "is_active" => select.order_by(api_tokens::Column::IsActive, order),
        "expires_at" => select.order_by(api_tokens::Column::ExpiresAt, order),
        "last_used" => select.order_by(api_tokens::Column::LastUsed, order),
        _ => select.order_by(api_tokens::Column::CreatedAt, order),
    }
    // 保证分页稳定
    .order_by_desc(api_tokens::Column::Id);

    let per_page = admin.list_per_page();
    let paginator = select.paginate(db, per_page);
    let total = paginator
        .num_items()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count tokens: {e}")))?;
    let num_pages = total.div_ceil(per_page).max(1);
    let page = query.page().min(num_pages - 1);
    let rows = paginator
        .fetch_page(page)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list tokens: {e}")))?;

    Ok(TokenPage {
        rows,
        total,
        page,
        per_page,
        num_pages,
    })
}

pub async fn find_token(
    db: &DatabaseConnection,
    token_id: i32,
) -> Result<Option<(TokenModel, Option<UserModel>)>, AppError> {
    ApiTokens::find_by_id(token_id)
        .find_also_related(users::Entity)
        .one(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to find token: {e}")))
}

pub async fn find_token_by_value(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<TokenModel>, AppError> {
    ApiTokens::find()
        .filter(api_tokens::Column::Token.eq(token))
        .one(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to find token: {e}")))
}

pub async fn insert_token(
    db: &DatabaseConnection,
    token: api_tokens::ActiveModel,
) -> Result<TokenModel, AppError> {
    token
        .insert(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create api token: {e}")))
}

pub async fn update_token(
    db: &DatabaseConnection,
    token: api_tokens::ActiveModel,
) -> Result<TokenModel, AppError> {
    token
        .update(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update api token: {e}")))
}

pub async fn touch_last_used(
    db: &DatabaseConnection,
    token: TokenModel,
) -> Result<TokenModel, AppError> {
    let mut active_model: api_tokens::ActiveModel = token.into();
    active_model.last_used = Set(Some(Utc::now()));
    active_model
        .update(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update token last used: {e}")))
}

pub async fn delete_token(db: &DatabaseConnection, token_id: i32) -> Result<bool, AppError> {
    let result = ApiTokens::delete_by_id(token_id)
        .exec(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete token: {e}")))?;

    Ok(result.rows_affected > 0)
}
