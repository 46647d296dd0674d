mod checker_tests;
mod dashboard_tests;
mod scraper_tests;
