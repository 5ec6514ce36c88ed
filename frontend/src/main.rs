use gloo_net::http::{Request, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement, InputEvent};
use yew::prelude::*;

const TOKEN_KEY: &str = "token";

#[derive(Clone, PartialEq, Deserialize)]
struct Transaction {
    id: i64,
    title: String,
    amount: f64,
    #[serde(rename = "type")]
    transaction_type: String,
    category: String,
    date: String,
    status: String,
}

#[derive(Clone, PartialEq, Deserialize)]
struct Budget {
    id: i64,
    name: String,
    category: String,
    amount: f64,
    period: String,
    month: String,
    spent: f64,
}

#[derive(Clone, PartialEq, Deserialize)]
struct UserProfile {
    email: String,
    full_name: String,
    created_at: String,
}

#[derive(Clone, PartialEq, Deserialize)]
struct TrendEntry {
    budget: f64,
    spent: f64,
    income: f64,
    month: String,
}

#[derive(Clone, PartialEq, Deserialize)]
struct CategorySpend {
    category: String,
    spent: f64,
}

#[derive(Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardStats {
    total_budget: f64,
    total_spent: f64,
    total_income: f64,
    budget_utilization: f64,
    monthly_trend: Vec<TrendEntry>,
    category_breakdown: Vec<CategorySpend>,
    recent_transactions: Vec<Transaction>,
    current_month_spent: f64,
}

#[derive(Clone, PartialEq, Deserialize)]
struct TypeTotal {
    #[serde(rename = "type")]
    transaction_type: String,
    total: f64,
}

#[derive(Clone, PartialEq, Deserialize)]
struct CategoryTotal {
    category: String,
    total: f64,
    #[serde(rename = "type")]
    transaction_type: String,
}

#[derive(Clone, PartialEq, Deserialize)]
struct MonthTotal {
    year: i32,
    month: u8,
    #[serde(rename = "type")]
    transaction_type: String,
    total: f64,
}

#[derive(Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportSummary {
    totals: Vec<TypeTotal>,
    by_category: Vec<CategoryTotal>,
    by_month: Vec<MonthTotal>,
}

fn stored_token() -> Option<String> {
    let storage = web_sys::window()?.local_storage().ok()??;
    storage.get_item(TOKEN_KEY).ok()?
}

fn store_token(token: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(Some(storage)) = window.local_storage() {
            let _ = storage.set_item(TOKEN_KEY, token);
        }
    }
}

fn clear_token() {
    if let Some(window) = web_sys::window() {
        if let Ok(Some(storage)) = window.local_storage() {
            let _ = storage.remove_item(TOKEN_KEY);
        }
    }
}

fn with_auth(builder: RequestBuilder) -> RequestBuilder {
    match stored_token() {
        Some(token) => builder.header("Authorization", &format!("Bearer {}", token)),
        None => builder,
    }
}

async fn fetch_json<T: DeserializeOwned>(url: &str) -> Option<T> {
    let resp = with_auth(Request::get(url)).send().await.ok()?;
    if !resp.ok() {
        return None;
    }
    resp.json::<T>().await.ok()
}

async fn error_message(resp: gloo_net::http::Response, fallback: &str) -> String {
    if let Ok(json) = resp.json::<serde_json::Value>().await {
        if let Some(msg) = json.get("error").and_then(|v| v.as_str()) {
            return msg.to_string();
        }
    }
    fallback.to_string()
}

fn format_amount(amount: f64) -> String {
    format!("${:.2}", amount)
}

fn input_value(e: &InputEvent) -> String {
    let input: HtmlInputElement = e.target_unchecked_into();
    input.value()
}

fn select_value(e: &Event) -> String {
    let select: HtmlSelectElement = e.target_unchecked_into();
    select.value()
}

fn bind_input(state: &UseStateHandle<String>) -> Callback<InputEvent> {
    let state = state.clone();
    Callback::from(move |e: InputEvent| state.set(input_value(&e)))
}

#[derive(Clone, Copy, PartialEq)]
enum AuthStatus {
    Checking,
    Authenticated,
    Unauthenticated,
}

#[derive(Clone, Copy, PartialEq)]
enum Page {
    Dashboard,
    Budgets,
    Transactions,
    Reports,
    Profile,
}

#[function_component(App)]
fn app() -> Html {
    let active_page = use_state(|| Page::Dashboard);
    let auth_status = use_state(|| AuthStatus::Checking);

    let on_select = {
        let active_page = active_page.clone();
        Callback::from(move |page: Page| active_page.set(page))
    };

    {
        let auth_status = auth_status.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                if stored_token().is_none() {
                    auth_status.set(AuthStatus::Unauthenticated);
                    return;
                }

                // Validate the stored token against the profile route so that
                // an expired token sends the user back to the login screen.
                match fetch_json::<UserProfile>("/api/users/me").await {
                    Some(_) => auth_status.set(AuthStatus::Authenticated),
                    None => {
                        clear_token();
                        auth_status.set(AuthStatus::Unauthenticated);
                    }
                }
            });
            || ()
        });
    }

    if *auth_status == AuthStatus::Checking {
        return html! {
            <div class="min-h-screen flex items-center justify-center text-slate-500">
                {"Checking session..."}
            </div>
        };
    }

    if *auth_status == AuthStatus::Unauthenticated {
        let on_authenticated = {
            let auth_status = auth_status.clone();
            Callback::from(move |_| auth_status.set(AuthStatus::Authenticated))
        };
        return html! { <AuthScreen {on_authenticated} /> };
    }

    let content = match *active_page {
        Page::Dashboard => html! { <DashboardPage /> },
        Page::Budgets => html! { <BudgetsPage /> },
        Page::Transactions => html! { <TransactionsPage /> },
        Page::Reports => html! { <ReportsPage /> },
        Page::Profile => html! { <ProfilePage /> },
    };

    html! {
        <Layout active_page={*active_page} {on_select}>
            { content }
        </Layout>
    }
}

#[derive(Properties, PartialEq)]
struct LayoutProps {
    children: Children,
    active_page: Page,
    on_select: Callback<Page>,
}

#[function_component(Layout)]
fn layout(props: &LayoutProps) -> Html {
    html! {
        <div class="flex h-screen">
            <Sidebar active_page={props.active_page} on_select={props.on_select.clone()} />
            <main class="flex-1 overflow-y-auto p-8">
                { for props.children.iter() }
            </main>
        </div>
    }
}

struct NavItem {
    label: &'static str,
    page: Page,
}

#[derive(Properties, PartialEq)]
struct SidebarProps {
    active_page: Page,
    on_select: Callback<Page>,
}

#[function_component(Sidebar)]
fn sidebar(props: &SidebarProps) -> Html {
    let nav_items = vec![
        NavItem { label: "Dashboard", page: Page::Dashboard },
        NavItem { label: "Budgets", page: Page::Budgets },
        NavItem { label: "Transactions", page: Page::Transactions },
        NavItem { label: "Reports", page: Page::Reports },
        NavItem { label: "Profile", page: Page::Profile },
    ];

    let on_logout = Callback::from(move |_| {
        clear_token();
        if let Some(window) = web_sys::window() {
            let _ = window.location().reload();
        }
    });

    html! {
        <div class="w-56 h-screen bg-slate-900 text-slate-200 flex flex-col p-4">
            <div class="text-xl font-bold text-white px-2 mb-8">{"Centsible"}</div>
            <nav class="flex-1 space-y-1">
                { for nav_items.iter().map(|item| {
                    let is_active = item.page == props.active_page;
                    let class_name = if is_active {
                        "block w-full text-left px-4 py-2 rounded-lg bg-slate-700 text-white"
                    } else {
                        "block w-full text-left px-4 py-2 rounded-lg hover:bg-slate-800"
                    };
                    let on_select = props.on_select.clone();
                    let page = item.page;
                    html! {
                        <button class={class_name} onclick={Callback::from(move |_| on_select.emit(page))}>
                            { item.label }
                        </button>
                    }
                }) }
            </nav>
            <button class="px-4 py-2 text-left rounded-lg hover:bg-slate-800" onclick={on_logout}>
                {"Log out"}
            </button>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct AuthScreenProps {
    on_authenticated: Callback<()>,
}

#[function_component(AuthScreen)]
fn auth_screen(props: &AuthScreenProps) -> Html {
    let is_login = use_state(|| true);
    let email = use_state(String::new);
    let password = use_state(String::new);
    let full_name = use_state(String::new);
    let error = use_state(|| None::<String>);
    let notice = use_state(|| None::<String>);
    let loading = use_state(|| false);

    let on_submit = {
        let is_login = is_login.clone();
        let email = email.clone();
        let password = password.clone();
        let full_name = full_name.clone();
        let error = error.clone();
        let notice = notice.clone();
        let loading = loading.clone();
        let on_authenticated = props.on_authenticated.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let email_val = (*email).clone();
            let password_val = (*password).clone();
            let full_name_val = (*full_name).clone();

            if email_val.is_empty() || password_val.is_empty() {
                error.set(Some("Email and password are required".to_string()));
                return;
            }
            if !*is_login && full_name_val.is_empty() {
                error.set(Some("Full name is required".to_string()));
                return;
            }

            loading.set(true);
            error.set(None);
            notice.set(None);

            let login = *is_login;
            let is_login = is_login.clone();
            let error = error.clone();
            let notice = notice.clone();
            let loading = loading.clone();
            let on_authenticated = on_authenticated.clone();

            spawn_local(async move {
                if login {
                    let body = serde_json::json!({
                        "email": email_val,
                        "password": password_val,
                    });
                    let response = Request::post("/api/auth/login")
                        .json(&body)
                        .expect("body serializes")
                        .send()
                        .await;

                    match response {
                        Ok(resp) if resp.ok() => {
                            if let Ok(json) = resp.json::<serde_json::Value>().await {
                                if let Some(token) = json.get("token").and_then(|v| v.as_str()) {
                                    store_token(token);
                                    on_authenticated.emit(());
                                }
                            }
                        }
                        Ok(resp) => error.set(Some(error_message(resp, "Login failed").await)),
                        Err(_) => error.set(Some("Network error".to_string())),
                    }
                } else {
                    let body = serde_json::json!({
                        "email": email_val,
                        "password": password_val,
                        "fullName": full_name_val,
                    });
                    let response = Request::post("/api/auth/register")
                        .json(&body)
                        .expect("body serializes")
                        .send()
                        .await;

                    match response {
                        Ok(resp) if resp.ok() => {
                            notice.set(Some("Account created, please sign in.".to_string()));
                            is_login.set(true);
                        }
                        Ok(resp) => {
                            error.set(Some(error_message(resp, "Registration failed").await))
                        }
                        Err(_) => error.set(Some("Network error".to_string())),
                    }
                }
                loading.set(false);
            });
        })
    };

    let toggle_mode = {
        let is_login = is_login.clone();
        let error = error.clone();
        Callback::from(move |_| {
            is_login.set(!*is_login);
            error.set(None);
        })
    };

    html! {
        <div class="min-h-screen flex items-center justify-center">
            <div class="w-full max-w-md bg-white rounded-2xl shadow-lg p-8">
                <div class="text-center mb-6">
                    <h1 class="text-2xl font-bold">
                        { if *is_login { "Welcome back" } else { "Create account" } }
                    </h1>
                    <p class="text-sm text-slate-500 mt-2">
                        { if *is_login { "Sign in to continue." } else { "Start tracking your money." } }
                    </p>
                </div>

                <form class="space-y-4" onsubmit={on_submit}>
                    if !*is_login {
                        <div class="space-y-1">
                            <label class="text-sm font-medium">{"Full name"}</label>
                            <input
                                type="text"
                                class="w-full px-4 py-2 border rounded-lg"
                                value={(*full_name).clone()}
                                oninput={bind_input(&full_name)}
                            />
                        </div>
                    }
                    <div class="space-y-1">
                        <label class="text-sm font-medium">{"Email"}</label>
                        <input
                            type="email"
                            class="w-full px-4 py-2 border rounded-lg"
                            value={(*email).clone()}
                            oninput={bind_input(&email)}
                        />
                    </div>
                    <div class="space-y-1">
                        <label class="text-sm font-medium">{"Password"}</label>
                        <input
                            type="password"
                            class="w-full px-4 py-2 border rounded-lg"
                            value={(*password).clone()}
                            oninput={bind_input(&password)}
                        />
                    </div>

                    if let Some(msg) = &*error {
                        <div class="text-sm text-red-500">{ msg.clone() }</div>
                    }
                    if let Some(msg) = &*notice {
                        <div class="text-sm text-green-600">{ msg.clone() }</div>
                    }

                    <button
                        type="submit"
                        class="w-full bg-slate-900 text-white py-2 rounded-lg font-semibold"
                        disabled={*loading}
                    >
                        { if *loading { "Please wait..." } else if *is_login { "Sign in" } else { "Sign up" } }
                    </button>
                </form>

                <div class="mt-6 text-center text-sm text-slate-500">
                    { if *is_login { "No account?" } else { "Already have an account?" } }
                    <button class="ml-2 font-semibold text-slate-900" onclick={toggle_mode}>
                        { if *is_login { "Sign up" } else { "Sign in" } }
                    </button>
                </div>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct StatCardProps {
    label: &'static str,
    value: String,
}

#[function_component(StatCard)]
fn stat_card(props: &StatCardProps) -> Html {
    html! {
        <div class="bg-white rounded-2xl shadow p-6">
            <p class="text-sm text-slate-500">{ props.label }</p>
            <p class="text-2xl font-bold mt-1">{ props.value.clone() }</p>
        </div>
    }
}

#[function_component(DashboardPage)]
fn dashboard_page() -> Html {
    let stats = use_state(DashboardStats::default);
    let loading = use_state(|| true);

    {
        let stats = stats.clone();
        let loading = loading.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                if let Some(fetched) = fetch_json::<DashboardStats>("/api/dashboard/stats").await {
                    stats.set(fetched);
                }
                loading.set(false);
            });
            || ()
        });
    }

    if *loading {
        return html! { <p class="text-slate-500">{"Loading..."}</p> };
    }

    // Alerts come from the current month, the last entry of the trend.
    let mut alerts = Vec::new();
    if let Some(current) = stats.monthly_trend.last() {
        if current.budget > 0.0 {
            if current.spent > current.budget {
                alerts.push("You are over your total budget!");
            } else if current.spent / current.budget > 0.8 {
                alerts.push("You have used over 80% of your budget.");
            }
        }
    }

    let trend_max = stats
        .monthly_trend
        .iter()
        .map(|entry| entry.spent.max(entry.income))
        .fold(1.0f64, f64::max);

    let category_max = stats
        .category_breakdown
        .iter()
        .map(|entry| entry.spent)
        .fold(1.0f64, f64::max);

    html! {
        <div class="space-y-8">
            <h2 class="text-2xl font-bold">{"Dashboard"}</h2>

            <div class="grid grid-cols-1 md:grid-cols-5 gap-4">
                <StatCard label="Total budget" value={format_amount(stats.total_budget)} />
                <StatCard label="Total spent" value={format_amount(stats.total_spent)} />
                <StatCard label="Total income" value={format_amount(stats.total_income)} />
                <StatCard
                    label="Budget used"
                    value={format!("{:.0}%", stats.budget_utilization * 100.0)}
                />
                <StatCard label="Spent this month" value={format_amount(stats.current_month_spent)} />
            </div>

            <div class="bg-white rounded-2xl shadow p-6 border border-yellow-200">
                <h3 class="font-semibold text-yellow-700 mb-4">{"Alerts"}</h3>
                if alerts.is_empty() {
                    <p class="text-sm text-slate-500">{"No alerts"}</p>
                } else {
                    <ul class="space-y-2">
                        { for alerts.iter().map(|alert| html! {
                            <li class="text-sm font-medium text-yellow-800 flex items-center gap-2">
                                <span class="w-2 h-2 rounded-full bg-yellow-400"></span>
                                { *alert }
                            </li>
                        }) }
                    </ul>
                }
            </div>

            <div class="bg-white rounded-2xl shadow p-6">
                <h3 class="font-semibold mb-4">{"Last six months"}</h3>
                <div class="flex items-end gap-4 h-40">
                    { for stats.monthly_trend.iter().map(|entry| {
                        let spent_height = (entry.spent / trend_max * 100.0).round() as i64;
                        let income_height = (entry.income / trend_max * 100.0).round() as i64;
                        html! {
                            <div
                                class="flex-1 flex flex-col items-center gap-1"
                                title={format!("Budget {}", format_amount(entry.budget))}
                            >
                                <div class="flex items-end gap-1 w-full h-32">
                                    <div
                                        class="flex-1 bg-red-400 rounded-t"
                                        style={format!("height: {}%", spent_height)}
                                        title={format!("Spent {}", format_amount(entry.spent))}
                                    ></div>
                                    <div
                                        class="flex-1 bg-green-400 rounded-t"
                                        style={format!("height: {}%", income_height)}
                                        title={format!("Income {}", format_amount(entry.income))}
                                    ></div>
                                </div>
                                <span class="text-xs text-slate-500">{ entry.month.clone() }</span>
                            </div>
                        }
                    }) }
                </div>
            </div>

            <div class="grid grid-cols-1 md:grid-cols-2 gap-4">
                <div class="bg-white rounded-2xl shadow p-6">
                    <h3 class="font-semibold mb-4">{"Spending by category"}</h3>
                    if stats.category_breakdown.is_empty() {
                        <p class="text-sm text-slate-500">{"No expenses yet."}</p>
                    }
                    <div class="space-y-3">
                        { for stats.category_breakdown.iter().map(|entry| {
                            let width = (entry.spent / category_max * 100.0).round() as i64;
                            html! {
                                <div>
                                    <div class="flex justify-between text-sm mb-1">
                                        <span>{ entry.category.clone() }</span>
                                        <span>{ format_amount(entry.spent) }</span>
                                    </div>
                                    <div class="h-2 bg-slate-100 rounded">
                                        <div class="h-2 bg-slate-700 rounded" style={format!("width: {}%", width)}></div>
                                    </div>
                                </div>
                            }
                        }) }
                    </div>
                </div>

                <div class="bg-white rounded-2xl shadow p-6">
                    <h3 class="font-semibold mb-4">{"Recent transactions"}</h3>
                    if stats.recent_transactions.is_empty() {
                        <p class="text-sm text-slate-500">{"No transactions yet."}</p>
                    }
                    <ul class="divide-y">
                        { for stats.recent_transactions.iter().map(|transaction| html! {
                            <li class="py-2 flex justify-between text-sm">
                                <div>
                                    <p class="font-medium">{ transaction.title.clone() }</p>
                                    <p class="text-slate-500">{ format!("{} · {}", transaction.category, transaction.date) }</p>
                                </div>
                                <span class={ if transaction.transaction_type == "income" { "text-green-600" } else { "text-red-500" } }>
                                    { format_amount(transaction.amount) }
                                </span>
                            </li>
                        }) }
                    </ul>
                </div>
            </div>
        </div>
    }
}

#[function_component(BudgetsPage)]
fn budgets_page() -> Html {
    let budgets = use_state(Vec::<Budget>::new);
    let loading = use_state(|| true);
    let error = use_state(|| None::<String>);

    let form_name = use_state(String::new);
    let form_category = use_state(String::new);
    let form_amount = use_state(String::new);
    let form_period = use_state(|| "monthly".to_string());
    let editing = use_state(|| None::<i64>);

    let reload = {
        let budgets = budgets.clone();
        let loading = loading.clone();
        Callback::from(move |_: ()| {
            let budgets = budgets.clone();
            let loading = loading.clone();
            spawn_local(async move {
                if let Some(fetched) = fetch_json::<Vec<Budget>>("/api/budgets").await {
                    budgets.set(fetched);
                }
                loading.set(false);
            });
        })
    };

    {
        let reload = reload.clone();
        use_effect_with((), move |_| {
            reload.emit(());
            || ()
        });
    }

    let on_edit = {
        let editing = editing.clone();
        let form_name = form_name.clone();
        let form_category = form_category.clone();
        let form_amount = form_amount.clone();
        let form_period = form_period.clone();
        Callback::from(move |budget: Budget| {
            editing.set(Some(budget.id));
            form_name.set(budget.name);
            form_category.set(budget.category);
            form_amount.set(budget.amount.to_string());
            form_period.set(budget.period);
        })
    };

    let on_delete = {
        let reload = reload.clone();
        Callback::from(move |id: i64| {
            let reload = reload.clone();
            spawn_local(async move {
                let request = with_auth(Request::delete(&format!("/api/budgets/{}", id)));
                if request.send().await.is_ok() {
                    reload.emit(());
                }
            });
        })
    };

    let on_submit = {
        let form_name = form_name.clone();
        let form_category = form_category.clone();
        let form_amount = form_amount.clone();
        let form_period = form_period.clone();
        let editing = editing.clone();
        let error = error.clone();
        let reload = reload.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let name = form_name.trim().to_string();
            let category = form_category.trim().to_string();
            let Ok(amount) = form_amount.trim().parse::<f64>() else {
                error.set(Some("Amount must be a number.".to_string()));
                return;
            };
            if name.is_empty() || category.is_empty() {
                error.set(Some("Name and category are required.".to_string()));
                return;
            }

            error.set(None);

            let payload = serde_json::json!({
                "name": name,
                "category": category,
                "amount": amount,
                "period": (*form_period).clone(),
            });

            let form_name = form_name.clone();
            let form_category = form_category.clone();
            let form_amount = form_amount.clone();
            let editing_id = *editing;
            let editing = editing.clone();
            let error = error.clone();
            let reload = reload.clone();

            spawn_local(async move {
                let builder = match editing_id {
                    Some(id) => with_auth(Request::put(&format!("/api/budgets/{}", id))),
                    None => with_auth(Request::post("/api/budgets")),
                };

                let response = match builder.json(&payload) {
                    Ok(request) => request.send().await,
                    Err(_) => return,
                };

                match response {
                    Ok(resp) if resp.ok() => {
                        form_name.set(String::new());
                        form_category.set(String::new());
                        form_amount.set(String::new());
                        editing.set(None);
                        reload.emit(());
                    }
                    Ok(resp) => {
                        error.set(Some(error_message(resp, "Could not save the budget").await))
                    }
                    Err(_) => error.set(Some("Network error".to_string())),
                }
            });
        })
    };

    html! {
        <div class="space-y-8">
            <h2 class="text-2xl font-bold">{"Budgets"}</h2>

            <form class="bg-white rounded-2xl shadow p-6 grid grid-cols-1 md:grid-cols-5 gap-4 items-end" onsubmit={on_submit}>
                <div>
                    <label class="text-sm font-medium">{"Name"}</label>
                    <input class="w-full px-3 py-2 border rounded-lg" value={(*form_name).clone()} oninput={bind_input(&form_name)} />
                </div>
                <div>
                    <label class="text-sm font-medium">{"Category"}</label>
                    <input class="w-full px-3 py-2 border rounded-lg" value={(*form_category).clone()} oninput={bind_input(&form_category)} />
                </div>
                <div>
                    <label class="text-sm font-medium">{"Amount"}</label>
                    <input type="number" step="0.01" class="w-full px-3 py-2 border rounded-lg" value={(*form_amount).clone()} oninput={bind_input(&form_amount)} />
                </div>
                <div>
                    <label class="text-sm font-medium">{"Period"}</label>
                    <select
                        class="w-full px-3 py-2 border rounded-lg"
                        onchange={{
                            let form_period = form_period.clone();
                            Callback::from(move |e: Event| form_period.set(select_value(&e)))
                        }}
                    >
                        <option value="monthly" selected={*form_period == "monthly"}>{"Monthly"}</option>
                        <option value="yearly" selected={*form_period == "yearly"}>{"Yearly"}</option>
                    </select>
                </div>
                <button type="submit" class="bg-slate-900 text-white py-2 rounded-lg font-semibold">
                    { if editing.is_some() { "Save changes" } else { "Add budget" } }
                </button>
            </form>

            if let Some(msg) = &*error {
                <div class="text-sm text-red-500">{ msg.clone() }</div>
            }

            if *loading {
                <p class="text-slate-500">{"Loading..."}</p>
            } else if budgets.is_empty() {
                <p class="text-slate-500">{"No budgets yet. Add one above."}</p>
            }

            <div class="grid grid-cols-1 md:grid-cols-3 gap-4">
                { for budgets.iter().map(|budget| {
                    let over_budget = budget.spent > budget.amount;
                    let used = if budget.amount > 0.0 { budget.spent / budget.amount * 100.0 } else { 0.0 };
                    let width = used.min(100.0).round() as i64;
                    let budget_for_edit = budget.clone();
                    let on_edit = on_edit.clone();
                    let on_delete = on_delete.clone();
                    let id = budget.id;
                    html! {
                        <div class="bg-white rounded-2xl shadow p-6">
                            <div class="flex justify-between items-start">
                                <div>
                                    <p class="font-semibold">{ budget.name.clone() }</p>
                                    <p class="text-sm text-slate-500">
                                        { if budget.month.is_empty() {
                                            format!("{} · {}", budget.category, budget.period)
                                        } else {
                                            format!("{} · {} · {}", budget.category, budget.period, budget.month)
                                        } }
                                    </p>
                                </div>
                                <div class="flex gap-2 text-sm">
                                    <button class="text-slate-500 hover:text-slate-900" onclick={Callback::from(move |_| on_edit.emit(budget_for_edit.clone()))}>{"Edit"}</button>
                                    <button class="text-red-400 hover:text-red-600" onclick={Callback::from(move |_| on_delete.emit(id))}>{"Delete"}</button>
                                </div>
                            </div>
                            <p class="mt-4 text-sm">
                                { format!("{} of {} spent", format_amount(budget.spent), format_amount(budget.amount)) }
                            </p>
                            <div class="h-2 bg-slate-100 rounded mt-2">
                                <div
                                    class={ if over_budget { "h-2 bg-red-500 rounded" } else { "h-2 bg-slate-700 rounded" } }
                                    style={format!("width: {}%", width)}
                                ></div>
                            </div>
                        </div>
                    }
                }) }
            </div>
        </div>
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn export_csv(transactions: &[Transaction]) {
    let mut csv = String::from("Title,Amount,Type,Category,Date,Status\n");
    for transaction in transactions {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_field(&transaction.title),
            transaction.amount,
            transaction.transaction_type,
            csv_field(&transaction.category),
            transaction.date,
            transaction.status,
        ));
    }

    let href = format!(
        "data:text/csv;charset=utf-8,{}",
        String::from(js_sys::encode_uri_component(&csv))
    );

    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        if let Ok(element) = document.create_element("a") {
            let _ = element.set_attribute("href", &href);
            let _ = element.set_attribute("download", "transactions.csv");
            if let Some(anchor) = element.dyn_ref::<web_sys::HtmlElement>() {
                anchor.click();
            }
        }
    }
}

#[function_component(TransactionsPage)]
fn transactions_page() -> Html {
    let transactions = use_state(Vec::<Transaction>::new);
    let loading = use_state(|| true);
    let error = use_state(|| None::<String>);

    let search = use_state(String::new);
    let type_filter = use_state(|| "all".to_string());

    let form_title = use_state(String::new);
    let form_amount = use_state(String::new);
    let form_type = use_state(|| "expense".to_string());
    let form_category = use_state(String::new);
    let form_date = use_state(String::new);
    let editing = use_state(|| None::<i64>);

    let reload = {
        let transactions = transactions.clone();
        let loading = loading.clone();
        Callback::from(move |_: ()| {
            let transactions = transactions.clone();
            let loading = loading.clone();
            spawn_local(async move {
                if let Some(fetched) = fetch_json::<Vec<Transaction>>("/api/transactions").await {
                    transactions.set(fetched);
                }
                loading.set(false);
            });
        })
    };

    {
        let reload = reload.clone();
        use_effect_with((), move |_| {
            reload.emit(());
            || ()
        });
    }

    let visible: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| {
            let matches_type =
                *type_filter == "all" || transaction.transaction_type == *type_filter;
            let needle = search.to_lowercase();
            let matches_search = needle.is_empty()
                || transaction.title.to_lowercase().contains(&needle)
                || transaction.category.to_lowercase().contains(&needle);
            matches_type && matches_search
        })
        .cloned()
        .collect();

    let on_export = {
        let visible = visible.clone();
        Callback::from(move |_| export_csv(&visible))
    };

    let on_edit = {
        let editing = editing.clone();
        let form_title = form_title.clone();
        let form_amount = form_amount.clone();
        let form_type = form_type.clone();
        let form_category = form_category.clone();
        let form_date = form_date.clone();
        Callback::from(move |transaction: Transaction| {
            editing.set(Some(transaction.id));
            form_title.set(transaction.title);
            form_amount.set(transaction.amount.to_string());
            form_type.set(transaction.transaction_type);
            form_category.set(transaction.category);
            form_date.set(transaction.date);
        })
    };

    let on_delete = {
        let reload = reload.clone();
        Callback::from(move |id: i64| {
            let reload = reload.clone();
            spawn_local(async move {
                let request = with_auth(Request::delete(&format!("/api/transactions/{}", id)));
                if request.send().await.is_ok() {
                    reload.emit(());
                }
            });
        })
    };

    let on_submit = {
        let form_title = form_title.clone();
        let form_amount = form_amount.clone();
        let form_type = form_type.clone();
        let form_category = form_category.clone();
        let form_date = form_date.clone();
        let editing = editing.clone();
        let error = error.clone();
        let reload = reload.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let title = form_title.trim().to_string();
            let category = form_category.trim().to_string();
            let date = form_date.trim().to_string();
            let Ok(amount) = form_amount.trim().parse::<f64>() else {
                error.set(Some("Amount must be a number.".to_string()));
                return;
            };
            if title.is_empty() || category.is_empty() || date.is_empty() {
                error.set(Some("Please complete all fields.".to_string()));
                return;
            }

            error.set(None);

            let payload = serde_json::json!({
                "title": title,
                "amount": amount,
                "type": (*form_type).clone(),
                "category": category,
                "date": date,
            });

            let form_title = form_title.clone();
            let form_amount = form_amount.clone();
            let form_category = form_category.clone();
            let form_date = form_date.clone();
            let editing_id = *editing;
            let editing = editing.clone();
            let error = error.clone();
            let reload = reload.clone();

            spawn_local(async move {
                let builder = match editing_id {
                    Some(id) => with_auth(Request::put(&format!("/api/transactions/{}", id))),
                    None => with_auth(Request::post("/api/transactions")),
                };

                let response = match builder.json(&payload) {
                    Ok(request) => request.send().await,
                    Err(_) => return,
                };

                match response {
                    Ok(resp) if resp.ok() => {
                        form_title.set(String::new());
                        form_amount.set(String::new());
                        form_category.set(String::new());
                        form_date.set(String::new());
                        editing.set(None);
                        reload.emit(());
                    }
                    Ok(resp) => error.set(Some(
                        error_message(resp, "Could not save the transaction").await,
                    )),
                    Err(_) => error.set(Some("Network error".to_string())),
                }
            });
        })
    };

    html! {
        <div class="space-y-8">
            <div class="flex items-center justify-between">
                <h2 class="text-2xl font-bold">{"Transactions"}</h2>
                <button class="px-4 py-2 border rounded-lg text-sm font-semibold" onclick={on_export}>
                    {"Export CSV"}
                </button>
            </div>

            <form class="bg-white rounded-2xl shadow p-6 grid grid-cols-1 md:grid-cols-6 gap-4 items-end" onsubmit={on_submit}>
                <div>
                    <label class="text-sm font-medium">{"Title"}</label>
                    <input class="w-full px-3 py-2 border rounded-lg" value={(*form_title).clone()} oninput={bind_input(&form_title)} />
                </div>
                <div>
                    <label class="text-sm font-medium">{"Amount"}</label>
                    <input type="number" step="0.01" class="w-full px-3 py-2 border rounded-lg" value={(*form_amount).clone()} oninput={bind_input(&form_amount)} />
                </div>
                <div>
                    <label class="text-sm font-medium">{"Type"}</label>
                    <select
                        class="w-full px-3 py-2 border rounded-lg"
                        onchange={{
                            let form_type = form_type.clone();
                            Callback::from(move |e: Event| form_type.set(select_value(&e)))
                        }}
                    >
                        <option value="expense" selected={*form_type == "expense"}>{"Expense"}</option>
                        <option value="income" selected={*form_type == "income"}>{"Income"}</option>
                    </select>
                </div>
                <div>
                    <label class="text-sm font-medium">{"Category"}</label>
                    <input class="w-full px-3 py-2 border rounded-lg" value={(*form_category).clone()} oninput={bind_input(&form_category)} />
                </div>
                <div>
                    <label class="text-sm font-medium">{"Date"}</label>
                    <input type="date" class="w-full px-3 py-2 border rounded-lg" value={(*form_date).clone()} oninput={bind_input(&form_date)} />
                </div>
                <button type="submit" class="bg-slate-900 text-white py-2 rounded-lg font-semibold">
                    { if editing.is_some() { "Save changes" } else { "Add" } }
                </button>
            </form>

            if let Some(msg) = &*error {
                <div class="text-sm text-red-500">{ msg.clone() }</div>
            }

            <div class="flex gap-4">
                <input
                    class="flex-1 px-3 py-2 border rounded-lg"
                    placeholder="Search by title or category"
                    value={(*search).clone()}
                    oninput={bind_input(&search)}
                />
                <select
                    class="px-3 py-2 border rounded-lg"
                    onchange={{
                        let type_filter = type_filter.clone();
                        Callback::from(move |e: Event| type_filter.set(select_value(&e)))
                    }}
                >
                    <option value="all" selected={*type_filter == "all"}>{"All"}</option>
                    <option value="expense" selected={*type_filter == "expense"}>{"Expenses"}</option>
                    <option value="income" selected={*type_filter == "income"}>{"Income"}</option>
                </select>
            </div>

            if *loading {
                <p class="text-slate-500">{"Loading..."}</p>
            } else if visible.is_empty() {
                <p class="text-slate-500">{"No transactions found."}</p>
            }

            <div class="bg-white rounded-2xl shadow divide-y">
                { for visible.iter().map(|transaction| {
                    let transaction_for_edit = transaction.clone();
                    let on_edit = on_edit.clone();
                    let on_delete = on_delete.clone();
                    let id = transaction.id;
                    html! {
                        <div class="p-4 flex items-center justify-between">
                            <div>
                                <p class="font-medium">{ transaction.title.clone() }</p>
                                <p class="text-sm text-slate-500">{ format!("{} · {}", transaction.category, transaction.date) }</p>
                            </div>
                            <div class="flex items-center gap-4">
                                <span class={ if transaction.transaction_type == "income" { "text-green-600 font-semibold" } else { "text-red-500 font-semibold" } }>
                                    { format_amount(transaction.amount) }
                                </span>
                                <button class="text-sm text-slate-500 hover:text-slate-900" onclick={Callback::from(move |_| on_edit.emit(transaction_for_edit.clone()))}>{"Edit"}</button>
                                <button class="text-sm text-red-400 hover:text-red-600" onclick={Callback::from(move |_| on_delete.emit(id))}>{"Delete"}</button>
                            </div>
                        </div>
                    }
                }) }
            </div>
        </div>
    }
}

fn month_name(month: u8) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

#[function_component(ReportsPage)]
fn reports_page() -> Html {
    let summary = use_state(ReportSummary::default);
    let loading = use_state(|| true);

    {
        let summary = summary.clone();
        let loading = loading.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                if let Some(fetched) = fetch_json::<ReportSummary>("/api/reports").await {
                    summary.set(fetched);
                }
                loading.set(false);
            });
            || ()
        });
    }

    if *loading {
        return html! { <p class="text-slate-500">{"Loading..."}</p> };
    }

    html! {
        <div class="space-y-8">
            <h2 class="text-2xl font-bold">{"Reports"}</h2>

            <div class="grid grid-cols-1 md:grid-cols-2 gap-4">
                { for summary.totals.iter().map(|entry| html! {
                    <StatCard
                        label={ if entry.transaction_type == "income" { "Income, all time" } else { "Expenses, all time" } }
                        value={format_amount(entry.total)}
                    />
                }) }
            </div>

            <div class="bg-white rounded-2xl shadow p-6">
                <h3 class="font-semibold mb-4">{"By category"}</h3>
                if summary.by_category.is_empty() {
                    <p class="text-sm text-slate-500">{"No transactions yet."}</p>
                }
                <table class="w-full text-sm">
                    <tbody>
                        { for summary.by_category.iter().map(|entry| html! {
                            <tr class="border-b last:border-0">
                                <td class="py-2">{ entry.category.clone() }</td>
                                <td class="py-2 text-slate-500">{ entry.transaction_type.clone() }</td>
                                <td class="py-2 text-right font-medium">{ format_amount(entry.total) }</td>
                            </tr>
                        }) }
                    </tbody>
                </table>
            </div>

            <div class="bg-white rounded-2xl shadow p-6">
                <h3 class="font-semibold mb-4">{"Monthly history"}</h3>
                if summary.by_month.is_empty() {
                    <p class="text-sm text-slate-500">{"No transactions in the last twelve months."}</p>
                }
                <table class="w-full text-sm">
                    <tbody>
                        { for summary.by_month.iter().map(|entry| html! {
                            <tr class="border-b last:border-0">
                                <td class="py-2">{ format!("{} {}", month_name(entry.month), entry.year) }</td>
                                <td class="py-2 text-slate-500">{ entry.transaction_type.clone() }</td>
                                <td class="py-2 text-right font-medium">{ format_amount(entry.total) }</td>
                            </tr>
                        }) }
                    </tbody>
                </table>
            </div>
        </div>
    }
}

#[function_component(ProfilePage)]
fn profile_page() -> Html {
    let profile = use_state(|| None::<UserProfile>);
    let full_name = use_state(String::new);
    let name_notice = use_state(|| None::<String>);

    let old_password = use_state(String::new);
    let new_password = use_state(String::new);
    let password_notice = use_state(|| None::<String>);
    let password_error = use_state(|| None::<String>);

    {
        let profile = profile.clone();
        let full_name = full_name.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                if let Some(fetched) = fetch_json::<UserProfile>("/api/users/me").await {
                    full_name.set(fetched.full_name.clone());
                    profile.set(Some(fetched));
                }
            });
            || ()
        });
    }

    let on_save_name = {
        let full_name = full_name.clone();
        let profile = profile.clone();
        let name_notice = name_notice.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let name = full_name.trim().to_string();
            if name.is_empty() {
                return;
            }

            let profile = profile.clone();
            let name_notice = name_notice.clone();
            spawn_local(async move {
                let payload = serde_json::json!({ "full_name": name });
                let response = match with_auth(Request::put("/api/users/me")).json(&payload) {
                    Ok(request) => request.send().await,
                    Err(_) => return,
                };

                if let Ok(resp) = response {
                    if resp.ok() {
                        if let Ok(updated) = resp.json::<UserProfile>().await {
                            profile.set(Some(updated));
                        }
                        name_notice.set(Some("Name updated.".to_string()));
                    }
                }
            });
        })
    };

    let on_change_password = {
        let old_password = old_password.clone();
        let new_password = new_password.clone();
        let password_notice = password_notice.clone();
        let password_error = password_error.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let old_val = (*old_password).clone();
            let new_val = (*new_password).clone();
            if old_val.is_empty() || new_val.is_empty() {
                password_error.set(Some("Both passwords are required.".to_string()));
                return;
            }

            let old_password = old_password.clone();
            let new_password = new_password.clone();
            let password_notice = password_notice.clone();
            let password_error = password_error.clone();
            spawn_local(async move {
                let payload = serde_json::json!({
                    "oldPassword": old_val,
                    "newPassword": new_val,
                });
                let response =
                    match with_auth(Request::put("/api/users/me/password")).json(&payload) {
                        Ok(request) => request.send().await,
                        Err(_) => return,
                    };

                match response {
                    Ok(resp) if resp.ok() => {
                        old_password.set(String::new());
                        new_password.set(String::new());
                        password_error.set(None);
                        password_notice.set(Some("Password changed.".to_string()));
                    }
                    Ok(resp) => {
                        password_notice.set(None);
                        password_error
                            .set(Some(error_message(resp, "Could not change password").await));
                    }
                    Err(_) => password_error.set(Some("Network error".to_string())),
                }
            });
        })
    };

    html! {
        <div class="space-y-8 max-w-xl">
            <h2 class="text-2xl font-bold">{"Profile"}</h2>

            if let Some(profile) = &*profile {
                <div class="bg-white rounded-2xl shadow p-6 space-y-1">
                    <p class="font-semibold">{ profile.full_name.clone() }</p>
                    <p class="text-sm text-slate-500">{ profile.email.clone() }</p>
                    <p class="text-sm text-slate-500">{ format!("Member since {}", profile.created_at) }</p>
                </div>
            }

            <form class="bg-white rounded-2xl shadow p-6 space-y-4" onsubmit={on_save_name}>
                <h3 class="font-semibold">{"Display name"}</h3>
                <input class="w-full px-3 py-2 border rounded-lg" value={(*full_name).clone()} oninput={bind_input(&full_name)} />
                if let Some(msg) = &*name_notice {
                    <p class="text-sm text-green-600">{ msg.clone() }</p>
                }
                <button type="submit" class="bg-slate-900 text-white px-4 py-2 rounded-lg font-semibold">{"Save"}</button>
            </form>

            <form class="bg-white rounded-2xl shadow p-6 space-y-4" onsubmit={on_change_password}>
                <h3 class="font-semibold">{"Change password"}</h3>
                <div>
                    <label class="text-sm font-medium">{"Current password"}</label>
                    <input type="password" class="w-full px-3 py-2 border rounded-lg" value={(*old_password).clone()} oninput={bind_input(&old_password)} />
                </div>
                <div>
                    <label class="text-sm font-medium">{"New password"}</label>
                    <input type="password" class="w-full px-3 py-2 border rounded-lg" value={(*new_password).clone()} oninput={bind_input(&new_password)} />
                </div>
                if let Some(msg) = &*password_error {
                    <p class="text-sm text-red-500">{ msg.clone() }</p>
                }
                if let Some(msg) = &*password_notice {
                    <p class="text-sm text-green-600">{ msg.clone() }</p>
                }
                <button type="submit" class="bg-slate-900 text-white px-4 py-2 rounded-lg font-semibold">{"Change password"}</button>
            </form>
        </div>
    }
}

fn main() {
    yew::Renderer::<App>::new().render();
}
