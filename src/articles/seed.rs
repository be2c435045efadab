use super::Article;

// (id, title, author, published_at, tags, excerpt, content)
const SEED: &[(u64, &str, &str, &str, &[&str], &str, &str)] = &[
    (
        1,
        "Introduction to React Hooks",
        "John Doe",
        "2023-09-15",
        &["react", "hooks", "javascript", "frontend"],
        "A comprehensive guide to React Hooks covering useState, useEffect, and custom hooks for modern React development.",
        "React Hooks are functions that let you use state and other React features \
         without writing a class. This comprehensive guide covers useState, \
         useEffect, and custom hooks. useState is the most basic hook that allows you \
         to add state to functional components. useEffect lets you perform side \
         effects in function components, replacing lifecycle methods like \
         componentDidMount and componentWillUnmount. Custom hooks enable you to \
         extract component logic into reusable functions that can be shared across \
         multiple components.",
    ),
    (
        2,
        "Building REST APIs with Node.js",
        "Jane Smith",
        "2023-09-20",
        &["nodejs", "express", "api", "backend"],
        "Complete tutorial on creating robust REST APIs with Node.js, Express, middleware, and database integration.",
        "Learn how to create robust REST APIs using Node.js and Express. This \
         tutorial covers routing, middleware, database integration, and best \
         practices. We'll start with setting up a basic Express server, then move on \
         to creating routes for different HTTP methods. Middleware functions are \
         essential for handling authentication, logging, and error handling. Database \
         integration using ORMs like Sequelize or TypeORM makes data management much \
         easier.",
    ),
    (
        3,
        "TypeScript Best Practices",
        "Mike Johnson",
        "2023-09-25",
        &["typescript", "javascript", "types", "development"],
        "Essential TypeScript best practices including interfaces, generics, and advanced typing techniques.",
        "TypeScript enhances JavaScript by adding static types. Discover best \
         practices for type definitions, interfaces, generics, and advanced typing \
         techniques. Start with basic type annotations for variables and function \
         parameters. Interfaces help define the shape of objects and can be extended \
         for more complex scenarios. Generics provide type safety while maintaining \
         flexibility. Advanced types like conditional types and mapped types enable \
         powerful type transformations.",
    ),
    (
        4,
        "CSS Grid vs Flexbox",
        "Sarah Wilson",
        "2023-10-01",
        &["css", "layout", "grid", "flexbox", "frontend"],
        "Comprehensive comparison of CSS Grid and Flexbox with practical examples and use cases.",
        "Understanding when to use CSS Grid versus Flexbox can make your layouts more \
         efficient. This article compares both layout systems with practical \
         examples. Flexbox is designed for one-dimensional layouts, perfect for \
         navigation bars, button groups, and centering content. CSS Grid excels at \
         two-dimensional layouts, ideal for page layouts, card grids, and complex \
         responsive designs. Often, the best approach is to use both together.",
    ),
    (
        5,
        "Database Optimization Techniques",
        "David Brown",
        "2023-10-05",
        &["database", "sql", "optimization", "performance", "backend"],
        "Essential database optimization techniques covering indexing, query optimization, and schema design.",
        "Improve your database performance with indexing strategies, query \
         optimization, and proper schema design. Learn about SQL optimization and \
         NoSQL best practices. Proper indexing can dramatically improve query \
         performance, but over-indexing can slow down writes. Query optimization \
         involves analyzing execution plans and rewriting inefficient queries. Schema \
         design should consider normalization vs denormalization tradeoffs based on \
         your application's read/write patterns.",
    ),
    (
        6,
        "Modern JavaScript ES2024 Features",
        "Alex Chen",
        "2024-01-15",
        &["javascript", "es2024", "features", "frontend"],
        "Latest JavaScript ES2024 features including new array methods and async improvements.",
        "Explore the latest JavaScript features introduced in ES2024. This includes \
         new array methods, improved async operations, and enhanced object \
         manipulation. The new array methods like groupBy() and toReversed() provide \
         more functional programming options. Promise.withResolvers() offers better \
         control over promise creation. The pipeline operator (when available) will \
         revolutionize function composition.",
    ),
    (
        7,
        "Microservices Architecture Patterns",
        "Lisa Rodriguez",
        "2024-02-10",
        &["microservices", "architecture", "patterns", "scalability", "backend"],
        "Essential microservices patterns for building scalable distributed systems.",
        "Learn essential patterns for building scalable microservices. This guide \
         covers service discovery, API gateways, circuit breakers, and distributed \
         data management. Service discovery helps services find and communicate with \
         each other dynamically. API gateways provide a single entry point and handle \
         cross-cutting concerns. Circuit breakers prevent cascade failures by failing \
         fast when downstream services are unavailable.",
    ),
    (
        8,
        "React Performance Optimization",
        "Tom Anderson",
        "2024-03-05",
        &["react", "performance", "optimization", "frontend"],
        "Complete guide to React performance optimization techniques and best practices.",
        "Optimize your React applications for better performance. Learn about \
         memoization, code splitting, lazy loading, and the React Profiler. \
         React.memo prevents unnecessary re-renders of functional components. useMemo \
         and useCallback memoize expensive computations and function references. Code \
         splitting with React.lazy and Suspense reduces initial bundle size. The \
         React Profiler helps identify performance bottlenecks.",
    ),
];

/// The demo articles the service starts with.
pub(super) fn articles() -> Vec<Article> {
    SEED.iter()
        .map(|&(id, title, author, published_at, tags, excerpt, content)| Article {
            id,
            title: title.to_owned(),
            content: content.to_owned(),
            author: author.to_owned(),
            published_at: published_at.to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            excerpt: excerpt.to_owned(),
        })
        .collect()
}
