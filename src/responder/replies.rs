//! Fixed reply text for the canned responder
//!
//! These strings are configuration data, not logic. The responder in the
//! parent module decides which one a given utterance receives.

/// Reply for questions about the speaker's life story
pub const LIFE_STORY: &str = "I grew up in a small coastal town where I developed a passion for marine biology. After completing my studies, I traveled extensively, documenting marine ecosystems across three continents. Now I balance research work with teaching at a local university, hoping to inspire the next generation of ocean advocates.";

/// Reply for questions about the speaker's #1 superpower
pub const SUPERPOWER: &str = "My #1 superpower is making complex concepts accessible to anyone. I have an innate ability to break down complicated ideas into simple, relatable explanations that resonate with people from different backgrounds and knowledge levels. This skill has served me well in both my professional and personal life.";

/// Reply for questions about areas the speaker wants to grow in
pub const GROWTH_AREAS: &str = "The top 3 areas I want to grow in are: 1) Public speaking - I want to become more comfortable addressing large audiences to share my research. 2) Technical writing - I aim to publish more peer-reviewed papers on marine conservation. 3) Work-life balance - I need to set better boundaries between my passion for work and personal time.";

/// Reply for questions about coworker misconceptions
pub const MISCONCEPTION: &str = "The biggest misconception my coworkers have about me is that I'm always serious and work-focused. While I am dedicated to my research, I actually have a playful side and love improvisational comedy. I participate in local improv shows monthly, something that surprises people who only know me from professional settings.";

/// Reply for questions about pushing boundaries and limits
pub const BOUNDARIES: &str = "I push my boundaries by deliberately seeking situations outside my comfort zone. Every year, I set a challenge that scares me - from learning to scuba dive despite my fear of deep water to presenting my research at international conferences despite public speaking anxiety. I believe growth happens at the edge of discomfort.";

/// Fallback when no rule matches, listing the supported questions
pub const UNSUPPORTED_QUESTION: &str = "I'm trained to answer only specific questions about the user. Please try asking one of these questions:\n\n1. What should we know about your life story in a few sentences?\n2. What's your #1 superpower?\n3. What are the top 3 areas you'd like to grow in?\n4. What misconception do your coworkers have about you?\n5. How do you push your boundaries and limits?";

/// Reply when the history contains no user turn at all
pub const NO_QUESTION: &str = "I couldn't understand your question. Could you please try again?";

/// Generic apology for internal responder failures
pub const APOLOGY: &str = "Sorry, I encountered an error processing your request.";
