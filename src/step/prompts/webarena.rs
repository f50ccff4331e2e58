//! WebArena 策略：每个站点一个根策略，外加站点专属子策略与共享子策略

use crate::step::policy::{PolicyEntry, PolicyTemplate};
use crate::step::prompts::instruction;

const LOW_LEVEL: &str = "click [id]: click the element with the given id\n\
type [id] [text] [0|1]: type text into the element, 1 to press Enter afterwards\n\
hover [id]: hover over the element\n\
scroll [up|down]: scroll the page\n\
goto [url]: open the url\n\
go_back: go to the previous page\n\
note [text]: remember a piece of information for later\n\
stop [answer]: finish the current task and report the answer";

fn root(body: &str, sub_tasks: &str) -> PolicyTemplate {
    PolicyTemplate::new(instruction(body, &format!("{LOW_LEVEL}\n{sub_tasks}")))
}

fn leaf(body: &str) -> PolicyTemplate {
    PolicyTemplate::new(instruction(body, LOW_LEVEL))
}

pub fn policies() -> Vec<PolicyEntry> {
    vec![
        // gitlab (8023)
        PolicyEntry::for_site(
            "github_agent",
            "github_agent",
            root(
                "You are an agent operating a GitLab instance. Delegate to a sub-task when one \
                fits the objective, otherwise act on the page directly.",
                "find_commits [query]: count or list commits matching the query\n\
                search_issues [query]: find issues matching the query\n\
                create_project [name]: create a new project",
            ),
        ),
        PolicyEntry::for_site(
            "find_commits",
            "github_agent",
            leaf("You inspect the commit history of a repository and report what was asked."),
        ),
        PolicyEntry::for_site(
            "search_issues",
            "github_agent",
            leaf("You search the issue tracker of a project and report the matching issues."),
        ),
        PolicyEntry::for_site(
            "create_project",
            "github_agent",
            leaf("You create a new project with the requested name and settings."),
        ),
        // reddit (9999)
        PolicyEntry::for_site(
            "reddit_agent",
            "reddit_agent",
            root(
                "You are an agent operating a Reddit-like forum. Delegate to a sub-task when \
                one fits the objective, otherwise act on the page directly.",
                "find_subreddit [name]: open the named forum\n\
                create_post [title and body]: submit a new post in the current forum",
            ),
        ),
        PolicyEntry::for_site(
            "find_subreddit",
            "reddit_agent",
            leaf("You open the forum list, find the requested forum and open it."),
        ),
        PolicyEntry::for_site(
            "create_post",
            "reddit_agent",
            leaf("You submit a post with the requested title and body in the current forum."),
        ),
        // shopping (7770)
        PolicyEntry::for_site(
            "shopping_agent",
            "shopping_agent",
            root(
                "You are an agent operating an online store. Delegate to a sub-task when one \
                fits the objective, otherwise act on the page directly.",
                "search_order [query]: find an order in the account order history\n\
                search_product [query]: find a product through the store search",
            ),
        ),
        PolicyEntry::for_site(
            "search_order",
            "shopping_agent",
            leaf("You open My Orders, page through the order history and report the matching order."),
        ),
        PolicyEntry::for_site(
            "search_product",
            "shopping_agent",
            leaf("You use the store search box to find the requested product and open it."),
        ),
        // shopping admin (7780)
        PolicyEntry::for_site(
            "shopping_admin_agent",
            "shopping_admin_agent",
            root(
                "You are an agent operating the admin panel of an online store. Delegate to a \
                sub-task when one fits the objective, otherwise act on the page directly.",
                "search_customer [query]: find a customer record\n\
                search_reviews [query]: find product reviews\n\
                list_products [filter]: list products matching a filter",
            ),
        ),
        PolicyEntry::for_site(
            "search_customer",
            "shopping_admin_agent",
            leaf("You open Customers > All Customers, filter by the query and report the match."),
        ),
        PolicyEntry::for_site(
            "search_reviews",
            "shopping_admin_agent",
            leaf("You open Marketing > All Reviews, filter by the query and report the reviews."),
        ),
        PolicyEntry::for_site(
            "list_products",
            "shopping_admin_agent",
            leaf("You open Catalog > Products, apply the filter and report the products."),
        ),
        // maps (3000)
        PolicyEntry::for_site(
            "maps_agent",
            "maps_agent",
            root(
                "You are an agent operating an OpenStreetMap site. Delegate to a sub-task when \
                one fits the objective, otherwise act on the page directly.",
                "find_directions [from and to]: get directions between two places\n\
                search_nearest_place [place and category]: find the closest place of a kind",
            ),
        ),
        PolicyEntry::for_site(
            "find_directions",
            "maps_agent",
            leaf("You open the directions panel, enter both endpoints and report the route."),
        ),
        PolicyEntry::for_site(
            "search_nearest_place",
            "maps_agent",
            leaf("You search around the given place for the requested category and report the nearest one."),
        ),
        // shared
        PolicyEntry::shared(
            "ask_user",
            leaf("You could not resolve something on the page. Stop and report what is missing."),
        ),
    ]
}
