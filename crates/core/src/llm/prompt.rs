pub const SYSTEM_INSTRUCTION: &str = "You are AI Market Scout's assistant, a helpful and friendly AI \
specializing in stock market analysis and financial concepts. Provide concise and accurate \
information. Do not give financial advice.";

pub const GREETING: &str = "Hello! I am the AI Market Explorer assistant. How can I help you today? \
Ask me about market trends, specific stocks, or financial concepts.";

pub const FALLBACK_ERROR: &str = "Sorry, I encountered an error. Please try again.";

/// Expands a user query into the structured report request sent in thinking mode.
pub fn deep_analysis_prompt(query: &str) -> String {
    [
        format!("Generate a detailed market analysis report for the following query: \"{query}\"."),
        "Your response should be well-structured, using Markdown for formatting (e.g., headings, bold text, bullet points).".to_string(),
        "Please include the following sections in your report:".to_string(),
        String::new(),
        "### 1. Executive Summary".to_string(),
        "- A concise overview of the company/asset and the key findings of your analysis.".to_string(),
        String::new(),
        "### 2. Historical Performance Analysis".to_string(),
        "- Analyze key historical price trends, significant milestones, and periods of high volatility.".to_string(),
        "- Discuss its performance relative to the broader market or key competitors.".to_string(),
        String::new(),
        "### 3. Fundamental Analysis".to_string(),
        "- Evaluate the company's financial health (mentioning key metrics if possible, like revenue growth, profitability).".to_string(),
        "- Assess its market position, competitive advantages (moat), and the industry landscape.".to_string(),
        String::new(),
        "### 4. Future Outlook & Growth Catalysts".to_string(),
        "- Identify potential growth drivers, such as new products, market expansion, technological advancements, or strategic partnerships.".to_string(),
        "- Provide a forward-looking perspective on its potential trajectory.".to_string(),
        String::new(),
        "### 5. Potential Risks & Mitigating Factors".to_string(),
        "- Detail the primary risks (market, operational, regulatory, competitive).".to_string(),
        "- Discuss any known strategies or factors that might mitigate these risks.".to_string(),
        String::new(),
        "### 6. Concluding Remarks".to_string(),
        "- Summarize the overall investment thesis based on the analysis.".to_string(),
        String::new(),
        "Provide a comprehensive and insightful report based on publicly available information. Do not provide financial advice.".to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_analysis_prompt_interpolates_query() {
        let prompt = deep_analysis_prompt("Tesla risk");
        assert!(prompt.starts_with(
            "Generate a detailed market analysis report for the following query: \"Tesla risk\"."
        ));
        for section in 1..=6 {
            assert!(prompt.contains(&format!("### {section}.")));
        }
    }
}
